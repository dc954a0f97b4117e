use plotter_core::{AppViewModel, ChannelFault, ConnectionView};

/// Turns successive view models into the terminal lines that changed.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    connection: ConnectionView,
    connection_id: Option<String>,
    status: String,
    printed_messages: usize,
    slots: Vec<(String, String)>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut lines = Vec::new();

        if view.connection != self.connection {
            lines.push(format!(
                "[channel] {}",
                connection_label(view.connection, view.channel_fault.as_ref())
            ));
            self.connection = view.connection;
        }
        if view.connection_id != self.connection_id {
            if let Some(id) = &view.connection_id {
                lines.push(format!("[channel] connection id {id}"));
            }
            self.connection_id = view.connection_id.clone();
        }

        // A fresh connection starts a fresh log.
        if view.messages.len() < self.printed_messages {
            self.printed_messages = 0;
        }
        for message in &view.messages[self.printed_messages..] {
            lines.push(format!("[message] {message}"));
        }
        self.printed_messages = view.messages.len();

        if !view.status.is_empty() && view.status != self.status {
            lines.push(format!("[upload] {}", view.status));
        }
        self.status = view.status.clone();

        for slot in &view.result_slots {
            if !self.slots.contains(slot) {
                lines.push(format!("[result] {} = {}", slot.0, slot.1));
            }
        }
        self.slots = view.result_slots.clone();

        lines
    }
}

fn connection_label(connection: ConnectionView, fault: Option<&ChannelFault>) -> String {
    match connection {
        ConnectionView::Disconnected => "disconnected".to_string(),
        ConnectionView::Connecting => "connecting...".to_string(),
        ConnectionView::Open => "connected".to_string(),
        ConnectionView::Closed => "disconnected".to_string(),
        ConnectionView::Errored => match fault {
            Some(fault) => format!("error ({fault})"),
            None => "error".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_changes_are_printed() {
        let mut renderer = TerminalRenderer::new();
        let mut view = AppViewModel {
            connection: ConnectionView::Open,
            messages: vec![r#"{"connectionId":"A"}"#.to_string()],
            connection_id: Some("A".to_string()),
            ..AppViewModel::default()
        };

        let lines = renderer.render(&view);
        assert_eq!(
            lines,
            vec![
                "[channel] connected".to_string(),
                "[channel] connection id A".to_string(),
                r#"[message] {"connectionId":"A"}"#.to_string(),
            ]
        );
        assert!(renderer.render(&view).is_empty());

        view.messages.push(r#"{"barUrl":"X"}"#.to_string());
        view.result_slots = vec![("barUrl".to_string(), "X".to_string())];
        view.status = "Processing started, waiting for results...".to_string();
        let lines = renderer.render(&view);
        assert_eq!(
            lines,
            vec![
                r#"[message] {"barUrl":"X"}"#.to_string(),
                "[upload] Processing started, waiting for results...".to_string(),
                "[result] barUrl = X".to_string(),
            ]
        );
    }

    #[test]
    fn shrinking_log_restarts_printing() {
        let mut renderer = TerminalRenderer::new();
        let view = AppViewModel {
            messages: vec!["one".to_string(), "two".to_string()],
            ..AppViewModel::default()
        };
        renderer.render(&view);

        let fresh = AppViewModel {
            messages: vec!["three".to_string()],
            ..AppViewModel::default()
        };
        assert_eq!(renderer.render(&fresh), vec!["[message] three".to_string()]);
    }
}
