//! Validated names for collections and SQL identifiers.
//!
//! Anything interpolated into a collection name or a raw SQL string goes through
//! here first. Identifiers come from the database catalog, which we do not trust.

use crate::error::{Error, Result};

/// Purpose prefix for schema collections
pub const SCHEMA_PURPOSE: &str = "schema";

const MAX_COLLECTION_NAME_LEN: usize = 255;

fn is_collection_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Build the vector collection name for a database, e.g. `schema_demo_db`
pub fn collection_name(database: &str, purpose: &str) -> Result<String> {
    for (label, part) in [("purpose", purpose), ("database", database)] {
        if part.is_empty() {
            return Err(Error::InvalidIdentifier(format!(
                "collection {} must not be empty",
                label
            )));
        }
        if let Some(bad) = part.chars().find(|c| !is_collection_char(*c)) {
            return Err(Error::InvalidIdentifier(format!(
                "collection {} '{}' contains '{}'",
                label, part, bad
            )));
        }
    }

    let name = format!("{}_{}", purpose, database);
    if name.len() > MAX_COLLECTION_NAME_LEN {
        return Err(Error::InvalidIdentifier(format!(
            "collection name '{}' exceeds {} characters",
            name, MAX_COLLECTION_NAME_LEN
        )));
    }
    Ok(name)
}

/// Schema collection name for a database
pub fn schema_collection(database: &str) -> Result<String> {
    collection_name(database, SCHEMA_PURPOSE)
}

/// Validate a MySQL identifier and return it backtick-quoted
pub fn quote_identifier(ident: &str) -> Result<String> {
    if ident.is_empty() || ident.len() > 64 {
        return Err(Error::InvalidIdentifier(format!(
            "identifier '{}' must be 1-64 characters",
            ident
        )));
    }
    if let Some(bad) = ident.chars().find(|c| !is_identifier_char(*c)) {
        return Err(Error::InvalidIdentifier(format!(
            "identifier '{}' contains '{}'",
            ident, bad
        )));
    }
    Ok(format!("`{}`", ident))
}
