use base64::{Engine, engine::general_purpose::STANDARD};

use crate::errors::{Error, Result};

/// Where a manifest URI points.
#[derive(Debug, PartialEq)]
pub(crate) enum Scheme<'a> {
    /// Inline payload with optional mime type
    Data(Option<&'a str>, Vec<u8>),
    /// Anything the asset reader resolves (relative path or URL)
    External(&'a str),
}

impl<'a> TryFrom<&'a str> for Scheme<'a> {
    type Error = Error;

    fn try_from(uri: &'a str) -> Result<Self> {
        let is_data = uri
            .get(..5)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"));
        if !is_data {
            return Ok(Scheme::External(uri));
        }

        // rfc2397
        let content = &uri[5..];
        let Some((param, value)) = content.split_once(',') else {
            return Err(Error::malformed("data URI without payload separator"));
        };
        match param.split_once(';') {
            Some((mime, encoding)) if encoding.eq_ignore_ascii_case("base64") => {
                let mime = (!mime.is_empty()).then_some(mime);
                Ok(Scheme::Data(mime, STANDARD.decode(value)?))
            }
            Some((_, encoding)) => Err(Error::malformed(format!(
                "unsupported data URI encoding '{encoding}'"
            ))),
            // Plain payloads carry their bytes verbatim
            None => Ok(Scheme::Data(None, value.as_bytes().to_vec())),
        }
    }
}
