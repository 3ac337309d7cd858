use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use tradewire_core::DataNotice;

use crate::error::CliError;

/// Document printed for every successful command.
#[derive(Debug, Serialize)]
pub struct Report {
    pub request_id: Uuid,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<NoticeView>,
}

#[derive(Debug, Serialize)]
pub struct NoticeView {
    pub label: &'static str,
    #[serde(flatten)]
    pub notice: DataNotice,
}

impl Report {
    pub fn new(data: Value, notice: Option<DataNotice>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            data,
            notice: notice.map(|notice| NoticeView {
                label: notice.label(),
                notice,
            }),
        }
    }
}

pub fn render(report: &Report, pretty: bool) -> Result<(), CliError> {
    let payload = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    println!("{payload}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tradewire_core::ErrorKind;

    use super::*;

    #[test]
    fn live_report_has_no_notice() {
        let report = Report::new(json!({ "x": 1 }), None);
        let value = serde_json::to_value(&report).expect("serializable");

        assert!(value.get("notice").is_none());
        assert_eq!(value["data"]["x"], 1);
        assert_eq!(
            value["request_id"].as_str().map(str::len),
            Some(36),
            "hyphenated uuid"
        );
    }

    #[test]
    fn fallback_notice_is_labelled() {
        let report = Report::new(
            Value::Null,
            Some(DataNotice::Fallback {
                kind: ErrorKind::ServerFault,
                message: String::from("HTTP 503"),
            }),
        );
        let value = serde_json::to_value(&report).expect("serializable");

        assert_eq!(value["notice"]["label"], "Fallback Data");
        assert_eq!(value["notice"]["mode"], "fallback");
        assert_eq!(value["notice"]["kind"], "server_fault");
    }
}
