//! Removal of the wrapper that bots put around the JSON of a snapshot.

/// A literal prefix and suffix wrapped around a JSON document, which must be removed before the
/// document can be parsed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Envelope {
    pub prefix: &'static str,
    pub suffix: &'static str,
}

impl Envelope {
    /// The JSONP callback that `full_results.json` is served in, i.e., `ADD_RESULTS(…);`.
    pub const ADD_RESULTS: Self = Self {
        prefix: "ADD_RESULTS(",
        suffix: ");",
    };

    /// Returns the document inside this envelope. Whitespace outside of the envelope is ignored.
    pub fn strip<'a>(&self, contents: &'a str) -> Result<&'a str, EnvelopeError> {
        let Self { prefix, suffix } = *self;
        contents
            .trim()
            .strip_prefix(prefix)
            .ok_or(EnvelopeError::MissingPrefix { prefix })?
            .strip_suffix(suffix)
            .ok_or(EnvelopeError::MissingSuffix { suffix })
    }
}

/// An error encountered during [`Envelope::strip`].
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum EnvelopeError {
    #[error("expected contents to start with {prefix:?}")]
    MissingPrefix { prefix: &'static str },
    #[error("expected contents to end with {suffix:?}")]
    MissingSuffix { suffix: &'static str },
}

#[test]
fn strip_add_results() {
    assert_eq!(
        Envelope::ADD_RESULTS.strip(r#"ADD_RESULTS({"revision": "1"});"#),
        Ok(r#"{"revision": "1"}"#)
    );
    assert_eq!(
        Envelope::ADD_RESULTS.strip("\nADD_RESULTS({});\n"),
        Ok("{}"),
        "whitespace around the envelope should be ignored"
    );
    assert_eq!(
        Envelope::ADD_RESULTS.strip(r#"ADD_RESULTS({"actual": "f(x);"});"#),
        Ok(r#"{"actual": "f(x);"}"#),
        "only the outermost suffix should be removed"
    );
}

#[test]
fn strip_rejects_missing_parts() {
    assert_eq!(
        Envelope::ADD_RESULTS.strip("{});"),
        Err(EnvelopeError::MissingPrefix {
            prefix: "ADD_RESULTS("
        })
    );
    assert_eq!(
        Envelope::ADD_RESULTS.strip("ADD_RESULTS({}"),
        Err(EnvelopeError::MissingSuffix { suffix: ");" })
    );
    assert_eq!(
        Envelope::ADD_RESULTS.strip("ADD_RESULTS{});"),
        Err(EnvelopeError::MissingPrefix {
            prefix: "ADD_RESULTS("
        })
    );
}

#[test]
fn strip_custom_envelope() {
    let bare = Envelope {
        prefix: "",
        suffix: "",
    };
    assert_eq!(bare.strip(" {} "), Ok("{}"));
}
