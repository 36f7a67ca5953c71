use std::fmt;

use crate::error::{ParseErrorKind, Result, RtspError};

/// RTSP methods accepted by this stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Setup,
    Play,
    Pause,
    Teardown,
    Describe,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "SETUP",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Teardown => "TEARDOWN",
            Self::Describe => "DESCRIBE",
        }
    }

    fn parse(token: &str) -> Result<Self> {
        match token {
            "SETUP" => Ok(Self::Setup),
            "PLAY" => Ok(Self::Play),
            "PAUSE" => Ok(Self::Pause),
            "TEARDOWN" => Ok(Self::Teardown),
            "DESCRIBE" => Ok(Self::Describe),
            _ => Err(RtspError::Parse {
                kind: ParseErrorKind::UnknownMethod,
            }),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed RTSP request in the newline dialect (see [`crate::protocol`]).
///
/// SETUP carries the client's RTP receive port; PLAY, PAUSE and TEARDOWN
/// carry the session id; DESCRIBE carries neither.
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: Method,
    pub file_name: String,
    pub cseq: u32,
    /// Client RTP port from the `Transport:` line (SETUP only).
    pub client_port: Option<u16>,
    /// Session id from the `Session:` line (PLAY/PAUSE/TEARDOWN).
    pub session_id: Option<u32>,
}

impl RtspRequest {
    pub fn new(method: Method, file_name: &str, cseq: u32) -> Self {
        Self {
            method,
            file_name: file_name.to_string(),
            cseq,
            client_port: None,
            session_id: None,
        }
    }

    /// Advertise the client's RTP receive port (SETUP).
    pub fn with_client_port(mut self, port: u16) -> Self {
        self.client_port = Some(port);
        self
    }

    /// Name the session this request applies to (PLAY/PAUSE/TEARDOWN).
    pub fn with_session_id(mut self, id: u32) -> Self {
        self.session_id = Some(id);
        self
    }

    /// Parse a request from its text representation.
    ///
    /// Returns [`RtspError::Parse`] on malformed input, including
    /// methods outside the supported set.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut lines = raw.lines();

        let request_line = lines
            .next()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .ok_or(RtspError::Parse {
                kind: ParseErrorKind::EmptyMessage,
            })?;

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(RtspError::Parse {
                kind: ParseErrorKind::InvalidRequestLine,
            });
        }

        let method = Method::parse(parts[0])?;
        let file_name = parts[1].to_string();
        if parts[2] != "RTSP/1.0" {
            tracing::warn!(version = parts[2], "request with unexpected protocol version");
        }

        let cseq = lines
            .next()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|tokens| tokens.first() == Some(&"CSeq:"))
            .and_then(|tokens| tokens.get(1).and_then(|t| t.parse().ok()))
            .ok_or(RtspError::Parse {
                kind: ParseErrorKind::InvalidCSeq,
            })?;

        let third = lines.next().map(str::trim).filter(|line| !line.is_empty());

        let mut request = Self::new(method, &file_name, cseq);
        match method {
            Method::Setup => {
                // Transport: RTP/UDP; client_port= <port> -- the port is
                // the fourth whitespace-separated token.
                let port = third
                    .and_then(|line| line.split_whitespace().nth(3))
                    .and_then(|token| token.parse().ok())
                    .ok_or(RtspError::Parse {
                        kind: ParseErrorKind::MissingClientPort,
                    })?;
                request.client_port = Some(port);
            }
            Method::Play | Method::Pause | Method::Teardown => {
                let id = third
                    .filter(|line| line.starts_with("Session:"))
                    .and_then(|line| line.split_whitespace().nth(1))
                    .and_then(|token| token.parse().ok())
                    .ok_or(RtspError::Parse {
                        kind: ParseErrorKind::MissingSessionId,
                    })?;
                request.session_id = Some(id);
            }
            Method::Describe => {}
        }
        Ok(request)
    }

    /// Format the request in the wire dialect.
    pub fn serialize(&self) -> String {
        let mut text = format!(
            "{} {} RTSP/1.0\nCSeq: {}\n",
            self.method, self.file_name, self.cseq
        );
        if let Some(port) = self.client_port {
            text.push_str(&format!("Transport: RTP/UDP; client_port= {port}\n"));
        } else if let Some(id) = self.session_id {
            text.push_str(&format!("Session: {id}\n"));
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_setup_with_transport_port() {
        let raw = "SETUP movie.Mjpeg RTSP/1.0\nCSeq: 1\nTransport: RTP/UDP; client_port= 52341\n";
        let req = RtspRequest::parse(raw).unwrap();
        assert_eq!(req.method, Method::Setup);
        assert_eq!(req.file_name, "movie.Mjpeg");
        assert_eq!(req.cseq, 1);
        assert_eq!(req.client_port, Some(52341));
        assert_eq!(req.session_id, None);
    }

    #[test]
    fn parse_play_with_session() {
        let raw = "PLAY movie.Mjpeg RTSP/1.0\nCSeq: 3\nSession: 415032\n";
        let req = RtspRequest::parse(raw).unwrap();
        assert_eq!(req.method, Method::Play);
        assert_eq!(req.cseq, 3);
        assert_eq!(req.session_id, Some(415032));
    }

    #[test]
    fn parse_describe_has_two_lines() {
        let raw = "DESCRIBE movie.Mjpeg RTSP/1.0\nCSeq: 5\n";
        let req = RtspRequest::parse(raw).unwrap();
        assert_eq!(req.method, Method::Describe);
        assert_eq!(req.client_port, None);
        assert_eq!(req.session_id, None);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let raw = "RECORD movie.Mjpeg RTSP/1.0\nCSeq: 1\nSession: 1\n";
        let err = RtspRequest::parse(raw).unwrap_err();
        assert!(matches!(
            err,
            RtspError::Parse {
                kind: ParseErrorKind::UnknownMethod
            }
        ));
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(RtspRequest::parse("").is_err());
        assert!(RtspRequest::parse("\n").is_err());
    }

    #[test]
    fn missing_cseq_is_rejected() {
        let err = RtspRequest::parse("SETUP movie.Mjpeg RTSP/1.0\n").unwrap_err();
        assert!(matches!(
            err,
            RtspError::Parse {
                kind: ParseErrorKind::InvalidCSeq
            }
        ));
    }

    #[test]
    fn setup_without_transport_is_rejected() {
        let err = RtspRequest::parse("SETUP movie.Mjpeg RTSP/1.0\nCSeq: 1\n").unwrap_err();
        assert!(matches!(
            err,
            RtspError::Parse {
                kind: ParseErrorKind::MissingClientPort
            }
        ));
    }

    #[test]
    fn pause_without_session_is_rejected() {
        let err = RtspRequest::parse("PAUSE movie.Mjpeg RTSP/1.0\nCSeq: 2\n").unwrap_err();
        assert!(matches!(
            err,
            RtspError::Parse {
                kind: ParseErrorKind::MissingSessionId
            }
        ));
    }

    #[test]
    fn serialize_round_trips_each_method() {
        let setup = RtspRequest::new(Method::Setup, "movie.Mjpeg", 1).with_client_port(9000);
        let parsed = RtspRequest::parse(&setup.serialize()).unwrap();
        assert_eq!(parsed.method, Method::Setup);
        assert_eq!(parsed.client_port, Some(9000));

        let teardown =
            RtspRequest::new(Method::Teardown, "movie.Mjpeg", 4).with_session_id(123456);
        let parsed = RtspRequest::parse(&teardown.serialize()).unwrap();
        assert_eq!(parsed.method, Method::Teardown);
        assert_eq!(parsed.session_id, Some(123456));

        let describe = RtspRequest::new(Method::Describe, "movie.Mjpeg", 2);
        let parsed = RtspRequest::parse(&describe.serialize()).unwrap();
        assert_eq!(parsed.method, Method::Describe);
        assert_eq!(parsed.cseq, 2);
    }
}
