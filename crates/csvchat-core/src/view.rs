//! Derived rendering
//!
//! [`derive`] turns a [`ChatState`] into everything a front end draws. It
//! holds no state of its own and has no side effects, so a front end can call
//! it on every frame.

use serde_json::Value;

use crate::state::{ChatState, Message, Notice};

pub const EMPTY_TABLE_MESSAGE: &str = "No tabular data available in the response.";
pub const TYPING_MESSAGE: &str = "AI is typing...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<String>>,
    },
    /// Response was not a non-empty sequence of objects
    Empty,
}

impl TableView {
    pub fn empty_message(&self) -> Option<&'static str> {
        match self {
            TableView::Empty => Some(EMPTY_TABLE_MESSAGE),
            TableView::Rows { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadView<'a> {
    pub file_name: Option<&'a str>,
    pub can_upload: bool,
    pub uploading: bool,
    pub uploaded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatForm<'a> {
    pub input: &'a str,
    pub submit_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphForm<'a> {
    pub prompt: &'a str,
    pub submit_enabled: bool,
    pub submit_label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View<'a> {
    pub messages: &'a [Message],
    pub typing: bool,
    pub upload: UploadView<'a>,
    /// Present once any prompt response has been recorded
    pub table: Option<TableView>,
    pub graph_error: Option<&'a str>,
    pub iframe_src: Option<&'a str>,
    /// Present only after a confirmed upload
    pub chat_form: Option<ChatForm<'a>>,
    /// Present only once a prompt response exists
    pub graph_form: Option<GraphForm<'a>>,
    pub notice: Option<&'a Notice>,
}

pub fn derive(state: &ChatState) -> View<'_> {
    let upload = UploadView {
        file_name: state.upload.file.as_ref().map(|f| f.name.as_str()),
        can_upload: state.upload.file.is_some() && !state.upload.uploading,
        uploading: state.upload.uploading,
        uploaded: state.upload.uploaded,
    };

    let chat_form = state.upload.uploaded.then(|| ChatForm {
        input: state.input.as_str(),
        submit_enabled: !state.loading,
    });

    let graph_form = state.ai_response.as_ref().map(|_| GraphForm {
        prompt: state.graph.prompt.as_str(),
        submit_enabled: !state.graph.loading,
        submit_label: if state.graph.loading {
            "Loading Graph..."
        } else {
            "Generate Graph"
        },
    });

    View {
        messages: &state.messages,
        typing: state.loading,
        upload,
        table: state.ai_response.as_ref().map(|r| tabulate(r.value())),
        graph_error: state.graph.error.as_deref().filter(|e| !e.is_empty()),
        iframe_src: state.graph.iframe_src.as_deref().filter(|s| !s.is_empty()),
        chat_form,
        graph_form,
        notice: state.notice.as_ref(),
    }
}

/// Column headers come from the first row's keys; later rows are read per column.
pub fn tabulate(value: &Value) -> TableView {
    let Some(rows) = value.as_array() else {
        return TableView::Empty;
    };
    let Some(Value::Object(first)) = rows.first() else {
        return TableView::Empty;
    };

    let columns: Vec<String> = first.keys().cloned().collect();
    let rows = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|col| row.get(col).map(cell_text).unwrap_or_default())
                .collect()
        })
        .collect();

    TableView::Rows { columns, rows }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        nested => nested.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{AiResponse, StagedFile};
    use serde_json::json;

    #[test]
    fn test_tabulate_rows_in_order() {
        let table = tabulate(&json!([{"a": 1, "b": 2}, {"a": 3, "b": 4}]));
        assert_eq!(
            table,
            TableView::Rows {
                columns: vec!["a".into(), "b".into()],
                rows: vec![vec!["1".into(), "2".into()], vec!["3".into(), "4".into()]],
            }
        );
    }

    #[test]
    fn test_tabulate_keeps_backend_column_order() {
        let table = tabulate(&json!([{"zeta": "x", "alpha": "y"}]));
        match table {
            TableView::Rows { columns, .. } => assert_eq!(columns, vec!["zeta", "alpha"]),
            TableView::Empty => panic!("expected rows"),
        }
    }

    #[test]
    fn test_tabulate_non_sequence_is_empty() {
        assert_eq!(tabulate(&json!({})), TableView::Empty);
        assert_eq!(tabulate(&json!({"aiResponse": "hi"})), TableView::Empty);
        assert_eq!(tabulate(&json!([])), TableView::Empty);
        assert_eq!(tabulate(&json!([1, 2, 3])), TableView::Empty);
        assert_eq!(tabulate(&Value::Null), TableView::Empty);
        assert_eq!(TableView::Empty.empty_message(), Some(EMPTY_TABLE_MESSAGE));
    }

    #[test]
    fn test_tabulate_cell_text() {
        let table = tabulate(&json!([
            {"name": "north", "ok": true, "note": null, "tags": ["x"]},
            {"name": "south"}
        ]));
        let TableView::Rows { rows, .. } = table else {
            panic!("expected rows");
        };
        assert_eq!(rows[0], vec!["north", "true", "", r#"["x"]"#]);
        assert_eq!(rows[1], vec!["south", "", "", ""]);
    }

    #[test]
    fn test_forms_follow_state() {
        let mut state = ChatState::new("http://viewer/");
        let view = derive(&state);
        assert!(view.chat_form.is_none());
        assert!(view.graph_form.is_none());
        assert!(view.table.is_none());
        assert!(!view.upload.can_upload);

        state.upload.file = Some(StagedFile::new("data.csv", b"a\n1\n".to_vec()));
        assert!(derive(&state).upload.can_upload);

        state.upload.uploaded = true;
        let view = derive(&state);
        assert!(view.chat_form.is_some());
        assert!(view.graph_form.is_none());

        state.ai_response = Some(AiResponse(json!({})));
        let view = derive(&state);
        assert!(view.graph_form.is_some());
        assert_eq!(view.table, Some(TableView::Empty));
    }

    #[test]
    fn test_loading_disables_submit() {
        let mut state = ChatState::new("http://viewer/");
        state.upload.uploaded = true;
        state.ai_response = Some(AiResponse(json!([])));
        state.loading = true;
        state.graph.loading = true;

        let view = derive(&state);
        assert!(view.typing);
        assert!(!view.chat_form.unwrap().submit_enabled);
        let graph_form = view.graph_form.unwrap();
        assert!(!graph_form.submit_enabled);
        assert_eq!(graph_form.submit_label, "Loading Graph...");
    }
}
