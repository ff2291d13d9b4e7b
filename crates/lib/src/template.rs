//! Expansion of `%(key)s` placeholders in manifest commands.

/// Errors from [`expand`].
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TemplateError {
    /// A placeholder named a key that has no value.
    #[error("unknown template key {0:?}")]
    UnknownKey(String),
    /// A `%` that does not start `%%` or `%(key)s`.
    #[error("malformed placeholder at byte {0}")]
    Malformed(usize),
}

/// Replace each `%(key)s` in `template` with the value paired with `key` in
/// `vars`; `%%` becomes a literal `%`.
pub fn expand(template: &str, vars: &[(&str, &str)]) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(idx) = rest.find('%') {
        let pos = template.len() - rest.len() + idx;
        out.push_str(&rest[..idx]);
        let after = &rest[idx + 1..];
        if let Some(tail) = after.strip_prefix('%') {
            out.push('%');
            rest = tail;
            continue;
        }
        let (key, tail) = after
            .strip_prefix('(')
            .and_then(|s| s.split_once(')'))
            .ok_or(TemplateError::Malformed(pos))?;
        let tail = tail.strip_prefix('s').ok_or(TemplateError::Malformed(pos))?;
        let value = vars
            .iter()
            .find_map(|(k, v)| (*k == key).then_some(*v))
            .ok_or_else(|| TemplateError::UnknownKey(key.to_string()))?;
        out.push_str(value);
        rest = tail;
    }
    out.push_str(rest);
    Ok(out)
}
