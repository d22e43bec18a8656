/// One input line split into its service key and message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    pub service: String,
    pub message: String,
}

impl LogLine {
    /// Split `line` on its first `:`. Returns `None` when there is no separator.
    pub fn parse(line: &str) -> Option<LogLine> {
        let (service, message) = line.split_once(':')?;

        Some(LogLine {
            service: service.to_owned(),
            message: message.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_service_and_message() {
        assert_eq!(
            LogLine::parse("auth:user logged in"),
            Some(LogLine {
                service: "auth".to_owned(),
                message: "user logged in".to_owned(),
            })
        );
    }

    #[test]
    fn parse_splits_on_first_colon_only() {
        let line = LogLine::parse("api:GET /health -> 200 at 12:00:01").unwrap();

        assert_eq!(line.service, "api");
        assert_eq!(line.message, "GET /health -> 200 at 12:00:01");
    }

    #[test]
    fn parse_rejects_lines_without_separator() {
        assert_eq!(LogLine::parse("foo"), None);
        assert_eq!(LogLine::parse(""), None);
    }

    #[test]
    fn parse_keeps_empty_parts() {
        assert_eq!(
            LogLine::parse(":orphan message"),
            Some(LogLine {
                service: "".to_owned(),
                message: "orphan message".to_owned(),
            })
        );
        assert_eq!(
            LogLine::parse("svc:"),
            Some(LogLine {
                service: "svc".to_owned(),
                message: "".to_owned(),
            })
        );
    }
}
