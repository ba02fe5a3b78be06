use recsync_core::domain::SetupResult;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Trait for formatting CLI output
pub trait OutputFormatter: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn print_json(&self, value: &serde_json::Value);
    fn setup_report(&self, preset: &str, result: &SetupResult);
}

/// Human-readable output formatter with status marks and indentation
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {}", message);
    }
    fn info(&self, message: &str) {
        println!("  {}", message);
    }
    fn print_json(&self, _value: &serde_json::Value) {}
    fn setup_report(&self, preset: &str, result: &SetupResult) {
        for notice in result.notices() {
            self.info(notice);
        }
        for warning in result.warnings() {
            self.warn(warning);
        }
        for error in result.errors() {
            self.error(error);
        }
        if !result.has_errors() && !result.has_warnings() {
            self.success(&format!("Preset \"{}\" is ready", preset));
        }
    }
}

/// JSON output formatter
///
/// Only errors, warnings and explicit documents are printed; progress lines
/// are dropped so stdout stays machine readable.
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn warn(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"level": "warning", "message": message})
        );
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
    fn setup_report(&self, preset: &str, result: &SetupResult) {
        self.print_json(&serde_json::json!({
            "preset": preset,
            "ready": !result.has_errors() && !result.has_warnings(),
            "result": result,
        }));
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}
