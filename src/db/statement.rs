use std::fmt::Write;

/// A parameterized SQL statement. Every bind is sent as nullable text and
/// typed on the server side with an explicit cast where the column needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub binds: Vec<Option<String>>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }
}

/// Incremental builder that hands out `$n` placeholders in bind order.
#[derive(Debug, Default)]
pub struct QueryBuilder {
    sql: String,
    binds: Vec<Option<String>>,
}

impl QueryBuilder {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            binds: Vec::new(),
        }
    }

    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Registers a bind value and returns its placeholder without writing it.
    pub fn bind(&mut self, value: Option<String>) -> String {
        self.binds.push(value);
        format!("${}", self.binds.len())
    }

    /// Registers a bind value and appends its placeholder.
    pub fn push_bind(&mut self, value: impl Into<String>) -> &mut Self {
        let placeholder = self.bind(Some(value.into()));
        self.sql.push_str(&placeholder);
        self
    }

    pub fn bind_count(&self) -> usize {
        self.binds.len()
    }

    pub fn finish(self) -> Statement {
        Statement {
            sql: self.sql,
            binds: self.binds,
        }
    }
}

/// Double-quotes an identifier, escaping embedded quotes.
pub fn quote_ident(name: &str) -> String {
    let mut quoted = String::with_capacity(name.len() + 2);
    quoted.push('"');
    for c in name.chars() {
        if c == '"' {
            quoted.push('"');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// `"schema"."TABLE"`
pub fn qualified(schema: &str, table: &str) -> String {
    let mut out = String::new();
    let _ = write!(out, "{}.{}", quote_ident(schema), quote_ident(table));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_follow_bind_order() {
        let mut qb = QueryBuilder::new("SELECT 1 WHERE a = ");
        qb.push_bind("x").push(" AND b = ").push_bind("y");
        let stmt = qb.finish();
        assert_eq!(stmt.sql, "SELECT 1 WHERE a = $1 AND b = $2");
        assert_eq!(stmt.binds, vec![Some("x".to_string()), Some("y".to_string())]);
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("PID"), "\"PID\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
        assert_eq!(qualified("bd", "PROPOSALS"), "\"bd\".\"PROPOSALS\"");
    }
}
