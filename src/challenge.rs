//! Extraction of the credential and payment instruction from a `WWW-Authenticate` challenge.
//!
//! The accepted grammar is deliberately narrow:
//!
//! ```text
//! challenge = scheme 1*SP field OWS "," OWS field OWS
//! field     = name "=" DQUOTE 1*qchar DQUOTE
//! ```
//!
//! where the first field must be the credential field and the second the payment field. The
//! scheme and field names are matched case-insensitively, values are returned verbatim.

use reqwest::header::{HeaderMap, WWW_AUTHENTICATE};

use crate::{
    error::ChallengeError,
    models::{Challenge, ChallengeFormat, Credential, PaymentInstruction},
};

/// Parse the challenge out of a set of response headers.
///
/// When several `WWW-Authenticate` headers are present, the first one that parses wins.
pub fn parse_challenge(headers: &HeaderMap, format: &ChallengeFormat) -> Result<Challenge, ChallengeError> {
    let mut first_error = None;
    for value in headers.get_all(WWW_AUTHENTICATE) {
        let result = value
            .to_str()
            .map_err(|_| ChallengeError::Malformed("header is not visible ASCII".into()))
            .and_then(|value| parse_challenge_value(value, format));
        match result {
            Ok(challenge) => return Ok(challenge),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    Err(first_error.unwrap_or(ChallengeError::Missing))
}

/// Parse a single `WWW-Authenticate` header value.
pub fn parse_challenge_value(value: &str, format: &ChallengeFormat) -> Result<Challenge, ChallengeError> {
    let mut cursor = Cursor::new(value);
    cursor.skip_whitespace();

    let scheme = cursor.token();
    if !scheme.eq_ignore_ascii_case(&format.scheme) {
        return Err(malformed(format!("expected scheme {}, found {scheme:?}", format.scheme)));
    }
    if cursor.skip_whitespace() == 0 {
        return Err(malformed("expected whitespace after scheme"));
    }

    let credential = cursor.field(&format.credential_field)?;
    cursor.skip_whitespace();
    cursor.expect(',')?;
    cursor.skip_whitespace();
    let instruction = cursor.field(&format.payment_field)?;
    cursor.skip_whitespace();
    if !cursor.is_empty() {
        return Err(malformed(format!("unexpected trailing input {:?}", cursor.rest)));
    }

    Ok(Challenge { credential: Credential::new(credential), instruction: PaymentInstruction::new(instruction) })
}

fn malformed(reason: impl Into<String>) -> ChallengeError {
    ChallengeError::Malformed(reason.into())
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn skip_whitespace(&mut self) -> usize {
        let trimmed = self.rest.trim_start_matches([' ', '\t']);
        let skipped = self.rest.len() - trimmed.len();
        self.rest = trimmed;
        skipped
    }

    fn token(&mut self) -> &'a str {
        let end = self
            .rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || "-_.".contains(c)))
            .unwrap_or(self.rest.len());
        let (token, rest) = self.rest.split_at(end);
        self.rest = rest;
        token
    }

    fn expect(&mut self, c: char) -> Result<(), ChallengeError> {
        match self.rest.strip_prefix(c) {
            Some(rest) => {
                self.rest = rest;
                Ok(())
            }
            None => Err(malformed(format!("expected {c:?} at {:?}", self.rest))),
        }
    }

    /// Consume `name="value"` and return the unquoted value.
    fn field(&mut self, name: &str) -> Result<&'a str, ChallengeError> {
        let found = self.token();
        if !found.eq_ignore_ascii_case(name) {
            return Err(malformed(format!("expected field {name}, found {found:?}")));
        }
        self.expect('=')?;
        self.expect('"')?;
        let end = self.rest.find('"').ok_or_else(|| malformed(format!("unterminated value for {name}")))?;
        let (value, rest) = self.rest.split_at(end);
        self.rest = &rest[1..];
        if value.is_empty() {
            return Err(malformed(format!("empty value for {name}")));
        }
        Ok(value)
    }
}
