use roster_shared::paging::ClassFilter;
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::QueryAs;

/// WHERE clause for the admin user list, with its positional parameters.
///
/// Parameters are numbered from `$1`; `next_param` is the first free index for
/// anything appended after the filter (LIMIT/OFFSET).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserFilter {
    conditions: Vec<String>,
    binds: Vec<String>,
}

impl UserFilter {
    pub fn new(q: &str, class: &ClassFilter) -> Self {
        let mut conditions = Vec::new();
        let mut binds = Vec::new();

        let q = q.trim();
        if !q.is_empty() {
            binds.push(format!("%{}%", escape_like(q)));
            conditions.push(format!("u.username ILIKE ${} ESCAPE '\\'", binds.len()));
        }

        match class {
            ClassFilter::Any => {}
            ClassFilter::Unassigned => conditions.push("u.class IS NULL".to_string()),
            ClassFilter::Class(label) => {
                binds.push(label.clone());
                conditions.push(format!("u.class = ${}", binds.len()));
            }
        }

        Self { conditions, binds }
    }

    /// `WHERE ...` including the keyword, or an empty string without conditions.
    pub fn where_sql(&self) -> String {
        if self.conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", self.conditions.join(" AND "))
        }
    }

    pub fn next_param(&self) -> usize {
        self.binds.len() + 1
    }

    pub fn bind_to<'q, O>(
        &'q self,
        mut query: QueryAs<'q, Postgres, O, PgArguments>,
    ) -> QueryAs<'q, Postgres, O, PgArguments> {
        for value in &self.binds {
            query = query.bind(value.as_str());
        }
        query
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_filter_means_no_where_clause() {
        let filter = UserFilter::new("  ", &ClassFilter::Any);
        assert_eq!(filter.where_sql(), "");
        assert_eq!(filter.next_param(), 1);
    }

    #[test]
    fn unassigned_class_has_no_parameter() {
        let filter = UserFilter::new("", &ClassFilter::Unassigned);
        assert_eq!(filter.where_sql(), "WHERE u.class IS NULL");
        assert_eq!(filter.next_param(), 1);
    }

    #[test]
    fn search_and_class_number_parameters_in_order() {
        let filter = UserFilter::new(" ann ", &ClassFilter::Class("7a".to_string()));
        assert_eq!(
            filter.where_sql(),
            "WHERE u.username ILIKE $1 ESCAPE '\\' AND u.class = $2"
        );
        assert_eq!(filter.binds, vec!["%ann%".to_string(), "7a".to_string()]);
        assert_eq!(filter.next_param(), 3);
    }

    #[test]
    fn like_wildcards_in_search_are_literal() {
        let filter = UserFilter::new("a_b%", &ClassFilter::Any);
        assert_eq!(filter.binds, vec!["%a\\_b\\%%".to_string()]);
    }
}
