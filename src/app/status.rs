#[derive(Debug, Clone)]
pub struct StatusLine {
    message: String,
}

pub const READY_STATUS: &str = "All changes saved.";

impl Default for StatusLine {
    fn default() -> Self {
        Self {
            message: READY_STATUS.to_string(),
        }
    }
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&mut self) {
        self.message = "Unsaved changes".to_string();
    }

    pub fn saving(&mut self, sequence: u64) {
        self.message = format!("Saving (#{sequence})…");
    }

    pub fn saved(&mut self, assigned: usize) {
        self.message = if assigned == 0 {
            READY_STATUS.to_string()
        } else {
            format!("Saved; {assigned} new question(s) stored")
        };
    }

    pub fn rejected(&mut self, status: u16) {
        self.message = format!("Save rejected by the server (status {status})");
    }

    pub fn save_failed(&mut self, reason: &str) {
        self.message = format!("Save failed: {reason}");
    }

    pub fn issues_remaining(&mut self, count: usize) {
        self.message = format!("{count} question(s) need attention");
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}
