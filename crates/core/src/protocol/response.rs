use crate::error::{ParseErrorKind, Result, RtspError};

/// An RTSP response in the newline dialect (see [`crate::protocol`]).
///
/// Built with the builder methods on the server side, parsed from wire
/// text on the client side:
///
/// ```
/// use rtsp_stream::protocol::RtspResponse;
///
/// let text = RtspResponse::ok(1).with_session(415032).serialize();
/// assert_eq!(text, "RTSP/1.0 200 OK\nCSeq: 1\nSession: 415032\n");
///
/// let parsed = RtspResponse::parse(&text).unwrap();
/// assert_eq!(parsed.status_code, 200);
/// assert_eq!(parsed.session_id, Some(415032));
/// ```
#[must_use]
#[derive(Debug, Clone)]
pub struct RtspResponse {
    pub status_code: u16,
    pub status_text: String,
    pub cseq: u32,
    /// Present once the server has assigned a session id.
    pub session_id: Option<u32>,
    /// `key=value` lines following the Session line (DESCRIBE).
    pub extension_lines: Vec<String>,
}

impl RtspResponse {
    pub fn new(status_code: u16, status_text: &str, cseq: u32) -> Self {
        Self {
            status_code,
            status_text: status_text.to_string(),
            cseq,
            session_id: None,
            extension_lines: Vec::new(),
        }
    }

    /// 200 OK.
    pub fn ok(cseq: u32) -> Self {
        Self::new(200, "OK", cseq)
    }

    /// 404 Not Found: the requested video file does not exist.
    pub fn not_found(cseq: u32) -> Self {
        Self::new(404, "Not Found", cseq)
    }

    /// 500 Internal Server Error: malformed request, CSeq mismatch, or
    /// illegal state transition.
    pub fn server_error(cseq: u32) -> Self {
        Self::new(500, "Internal Server Error", cseq)
    }

    pub fn with_session(mut self, id: u32) -> Self {
        self.session_id = Some(id);
        self
    }

    /// Append one `key=value` extension line.
    pub fn add_line(mut self, line: &str) -> Self {
        self.extension_lines.push(line.to_string());
        self
    }

    pub fn is_ok(&self) -> bool {
        self.status_code == 200
    }

    /// Format the response in the wire dialect.
    pub fn serialize(&self) -> String {
        let mut text = format!(
            "RTSP/1.0 {} {}\nCSeq: {}\n",
            self.status_code, self.status_text, self.cseq
        );
        if let Some(id) = self.session_id {
            text.push_str(&format!("Session: {id}\n"));
        }
        for line in &self.extension_lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }

    /// Parse a response from its text representation.
    ///
    /// A zero-length input means the peer closed the control connection
    /// and is reported as [`RtspError::PeerDisconnected`].
    pub fn parse(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(RtspError::PeerDisconnected);
        }
        let lines: Vec<&str> = raw.lines().collect();

        let status_parts: Vec<&str> = lines[0].split_whitespace().collect();
        let status_code: u16 = status_parts
            .get(1)
            .and_then(|token| token.parse().ok())
            .ok_or(RtspError::Parse {
                kind: ParseErrorKind::InvalidStatusLine,
            })?;
        let status_text = status_parts.get(2..).unwrap_or_default().join(" ");

        let cseq = lines
            .get(1)
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|token| token.parse().ok())
            .ok_or(RtspError::Parse {
                kind: ParseErrorKind::InvalidCSeq,
            })?;

        let mut response = Self::new(status_code, &status_text, cseq);

        let mut rest = 2;
        if let Some(line) = lines.get(2).filter(|line| line.starts_with("Session:")) {
            response.session_id = line.split_whitespace().nth(1).and_then(|t| t.parse().ok());
            rest = 3;
        }
        response.extension_lines = lines[rest.min(lines.len())..]
            .iter()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.to_string())
            .collect();

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_ok_with_session() {
        let text = RtspResponse::ok(1).with_session(415032).serialize();
        assert_eq!(text, "RTSP/1.0 200 OK\nCSeq: 1\nSession: 415032\n");
    }

    #[test]
    fn serialize_error_without_session() {
        let text = RtspResponse::not_found(2).serialize();
        assert_eq!(text, "RTSP/1.0 404 Not Found\nCSeq: 2\n");
    }

    #[test]
    fn serialize_with_extension_lines() {
        let text = RtspResponse::ok(5)
            .with_session(111111)
            .add_line("encoding=MJPEG")
            .add_line("payload_type=26")
            .serialize();
        assert!(text.ends_with("Session: 111111\nencoding=MJPEG\npayload_type=26\n"));
    }

    #[test]
    fn parse_status_cseq_and_session() {
        let resp = RtspResponse::parse("RTSP/1.0 200 OK\nCSeq: 3\nSession: 999999\n").unwrap();
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.cseq, 3);
        assert_eq!(resp.session_id, Some(999999));
        assert!(resp.extension_lines.is_empty());
        assert!(resp.is_ok());
    }

    #[test]
    fn parse_without_session_line() {
        let resp = RtspResponse::parse("RTSP/1.0 500 Internal Server Error\nCSeq: 7\n").unwrap();
        assert_eq!(resp.status_code, 500);
        assert_eq!(resp.session_id, None);
        assert!(!resp.is_ok());
    }

    #[test]
    fn parse_extension_lines_after_session() {
        let raw = "RTSP/1.0 200 OK\nCSeq: 4\nSession: 123456\nencoding=MJPEG\nfile=movie.Mjpeg\n";
        let resp = RtspResponse::parse(raw).unwrap();
        assert_eq!(
            resp.extension_lines,
            vec!["encoding=MJPEG".to_string(), "file=movie.Mjpeg".to_string()]
        );
    }

    #[test]
    fn parse_extension_lines_without_session() {
        let raw = "RTSP/1.0 200 OK\nCSeq: 1\nencoding=MJPEG\n";
        let resp = RtspResponse::parse(raw).unwrap();
        assert_eq!(resp.session_id, None);
        assert_eq!(resp.extension_lines, vec!["encoding=MJPEG".to_string()]);
    }

    #[test]
    fn empty_input_is_peer_disconnected() {
        assert!(matches!(
            RtspResponse::parse("").unwrap_err(),
            RtspError::PeerDisconnected
        ));
        assert!(matches!(
            RtspResponse::parse("  \n").unwrap_err(),
            RtspError::PeerDisconnected
        ));
    }

    #[test]
    fn garbage_status_line_is_rejected() {
        let err = RtspResponse::parse("hello world\nCSeq: 1\n").unwrap_err();
        assert!(matches!(
            err,
            RtspError::Parse {
                kind: ParseErrorKind::InvalidStatusLine
            }
        ));
    }
}
