/// Resolution strategy for a query parameter value (the string form used in
/// config files).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumString, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ValueKind {
    Static,
}

#[derive(Debug, Clone)]
pub struct QueryParamSpec {
    pub key: String,
    /// Strategy tag. Unknown tags fall back to `static`.
    pub value_type: String,
    pub value: String,
}

impl QueryParamSpec {
    pub fn kind(&self) -> ValueKind {
        self.value_type.parse().unwrap_or(ValueKind::Static)
    }

    /// Resolves to the concrete key/value pair sent on the wire.
    pub fn resolve(&self) -> (&str, &str) {
        match self.kind() {
            ValueKind::Static => (&self.key, &self.value),
        }
    }
}

/// Builds the query string for a request, `?`-prefixed, in declared order.
/// Empty when there are no params.
pub fn query_string(params: &[QueryParamSpec]) -> String {
    let mut out = String::new();
    for (idx, param) in params.iter().enumerate() {
        out.push(if idx == 0 { '?' } else { '&' });
        let (key, value) = param.resolve();
        out.push_str(key);
        out.push('=');
        out.push_str(value);
    }
    out
}
