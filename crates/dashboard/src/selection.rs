use core_types::{Script, ScriptId};

/// The scripts last fetched from the store, in the order they were listed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptLibrary {
    scripts: Vec<Script>,
}

impl ScriptLibrary {
    pub fn new(scripts: Vec<Script>) -> Self {
        Self { scripts }
    }

    pub fn get(&self, id: &ScriptId) -> Option<&Script> {
        self.scripts.iter().find(|s| &s.id == id)
    }

    /// Header for a script column. Ids missing from the library still get a
    /// label.
    pub fn label(&self, id: &ScriptId) -> String {
        self.get(id)
            .map(Script::display_label)
            .unwrap_or_else(|| id.fallback_label())
    }

    pub fn scripts(&self) -> &[Script] {
        &self.scripts
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }
}

/// Script ids whose results are shown as extra columns, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptSelection(Vec<ScriptId>);

impl ScriptSelection {
    /// Duplicate ids keep their first position.
    pub fn new<I: IntoIterator<Item = ScriptId>>(ids: I) -> Self {
        let mut selection = ScriptSelection::default();
        for id in ids {
            if !selection.contains(&id) {
                selection.0.push(id);
            }
        }
        selection
    }

    pub fn ids(&self) -> &[ScriptId] {
        &self.0
    }

    pub fn contains(&self, id: &ScriptId) -> bool {
        self.0.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Appends the id when absent, removes it when present.
    pub fn toggle(&mut self, id: ScriptId) {
        if self.contains(&id) {
            self.0.retain(|selected| selected != &id);
        } else {
            self.0.push(id);
        }
    }

    /// Returns whether the id was selected.
    pub fn remove(&mut self, id: &ScriptId) -> bool {
        let before = self.0.len();
        self.0.retain(|selected| selected != id);
        self.0.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(id: i64, name: Option<&str>, description: Option<&str>) -> Script {
        Script {
            id: ScriptId::from(id),
            name: name.map(str::to_string),
            description: description.map(str::to_string),
            code: "return 1".into(),
        }
    }

    #[test]
    fn labels_fall_back_to_the_id() {
        let library = ScriptLibrary::new(vec![
            script(1, Some("A"), None),
            script(2, None, Some("B")),
        ]);
        let labels: Vec<String> = [1, 2, 3]
            .into_iter()
            .map(|id| library.label(&ScriptId::from(id)))
            .collect();
        assert_eq!(labels, vec!["A", "B", "Script 3"]);
    }

    #[test]
    fn selection_keeps_order_without_duplicates() {
        let mut selection =
            ScriptSelection::new([ScriptId::from(2), ScriptId::from(1), ScriptId::from(2)]);
        assert_eq!(selection.ids(), [ScriptId::from(2), ScriptId::from(1)]);

        selection.toggle(ScriptId::from(3));
        selection.toggle(ScriptId::from(2));
        assert_eq!(selection.ids(), [ScriptId::from(1), ScriptId::from(3)]);

        assert!(selection.remove(&ScriptId::from(1)));
        assert!(!selection.remove(&ScriptId::from(1)));
    }

    #[test]
    fn order_is_part_of_selection_equality() {
        let a = ScriptSelection::new([ScriptId::from(1), ScriptId::from(2)]);
        let b = ScriptSelection::new([ScriptId::from(2), ScriptId::from(1)]);
        assert_ne!(a, b);
        assert_eq!(a, ScriptSelection::new([ScriptId::from(1), ScriptId::from(2)]));
    }
}
