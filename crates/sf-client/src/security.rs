//! Input hygiene for values that end up in SOQL text or URL paths.
//!
//! ```rust
//! use sfkit_client::security::{soql, url};
//!
//! let name = soql::escape_string("O'Brien");
//! let query = format!("SELECT Id FROM Contact WHERE LastName = '{}'", name);
//!
//! let path = format!("sobjects/Account/ExtId__c/{}", url::encode_param("A/B 1"));
//! ```

/// SOQL literal escaping and identifier validation.
pub mod soql {
    /// Escape a value for use inside a quoted SOQL string literal.
    ///
    /// ```rust
    /// use sfkit_client::security::soql;
    ///
    /// assert_eq!(soql::escape_string("O'Brien & Co."), "O\\'Brien & Co.");
    /// ```
    #[must_use]
    pub fn escape_string(value: &str) -> String {
        let mut escaped = String::with_capacity(value.len() + 8);
        for ch in value.chars() {
            match ch {
                '\'' => escaped.push_str("\\'"),
                '\\' => escaped.push_str("\\\\"),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                _ => escaped.push(ch),
            }
        }
        escaped
    }

    /// A field or relationship name: a letter followed by letters, digits
    /// or underscores (`Custom_Field__c`).
    #[must_use]
    pub fn is_safe_field_name(name: &str) -> bool {
        let mut chars = name.chars();
        chars.next().is_some_and(|first| first.is_ascii_alphabetic())
            && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
    }

    /// Object names follow the field name rules.
    #[must_use]
    pub fn is_safe_sobject_name(name: &str) -> bool {
        is_safe_field_name(name)
    }
}

/// URL path hygiene.
pub mod url {
    /// Percent-encode a single path segment or parameter value.
    ///
    /// ```rust
    /// use sfkit_client::security::url;
    ///
    /// assert_eq!(url::encode_param("001/../secret"), "001%2F..%2Fsecret");
    /// ```
    #[must_use]
    pub fn encode_param(value: &str) -> String {
        urlencoding::encode(value).into_owned()
    }

    /// Record ids are 15 or 18 ASCII alphanumerics.
    #[must_use]
    pub fn is_valid_salesforce_id(id: &str) -> bool {
        matches!(id.len(), 15 | 18) && id.chars().all(|c| c.is_ascii_alphanumeric())
    }
}
