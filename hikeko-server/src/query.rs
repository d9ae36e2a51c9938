use hikeko_api::BlogFilter;

pub enum Bind {
    Bool(bool),
    String(String),
}

#[derive(Default)]
pub struct Sql {
    pub where_clause: String,
    pub binds: Vec<Bind>,
}

impl Sql {
    /// Adds a Bind, returning the index that refers to it when the first bind is
    /// at index first_bind_idx
    fn add_bind(&mut self, first_bind_idx: usize, b: Bind) -> usize {
        let res = first_bind_idx + self.binds.len();
        self.binds.push(b);
        res
    }

    pub fn bind_to<'q>(
        &'q self,
        mut q: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    ) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
        for b in &self.binds {
            q = match b {
                Bind::Bool(b) => q.bind(*b),
                Bind::String(s) => q.bind(s.as_str()),
            };
        }
        q
    }
}

/// Assumes tables b (blogs) and u (users, joined on the blog author) are available
pub fn to_postgres(f: &BlogFilter, first_bind_idx: usize) -> Sql {
    let mut res = Sql::default();
    let idx = res.add_bind(first_bind_idx, Bind::Bool(false));
    res.where_clause.push_str(&format!("(b.draft = ${idx}"));
    match f {
        BlogFilter::Latest => (),
        BlogFilter::Tag { tag, eliminate } => {
            let idx = res.add_bind(first_bind_idx, Bind::String(tag.to_lowercase()));
            res.where_clause
                .push_str(&format!(" AND ${idx} = ANY(b.tags)"));
            if let Some(eliminate) = eliminate {
                let idx = res.add_bind(first_bind_idx, Bind::String(eliminate.0.clone()));
                res.where_clause
                    .push_str(&format!(" AND b.blog_id <> ${idx}"));
            }
        }
        BlogFilter::Author { username } => {
            let idx = res.add_bind(first_bind_idx, Bind::String(username.clone()));
            res.where_clause
                .push_str(&format!(" AND u.username = ${idx}"));
        }
        BlogFilter::Search { query } => {
            let idx = res.add_bind(first_bind_idx, Bind::String(query.to_lowercase()));
            res.where_clause
                .push_str(&format!(" AND strpos(lower(b.title), ${idx}) > 0"));
        }
    }
    res.where_clause.push(')');
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use hikeko_api::BlogId;

    fn strings(sql: &Sql) -> Vec<&str> {
        sql.binds
            .iter()
            .filter_map(|b| match b {
                Bind::String(s) => Some(s.as_str()),
                Bind::Bool(_) => None,
            })
            .collect()
    }

    #[test]
    fn latest_only_excludes_drafts() {
        let sql = to_postgres(&BlogFilter::Latest, 1);
        assert_eq!(sql.where_clause, "(b.draft = $1)");
        assert!(matches!(sql.binds[..], [Bind::Bool(false)]));
    }

    #[test]
    fn tag_with_eliminated_blog() {
        let sql = to_postgres(
            &BlogFilter::Tag {
                tag: String::from("Travel"),
                eliminate: Some(BlogId(String::from("alps-xyz"))),
            },
            3,
        );
        assert_eq!(
            sql.where_clause,
            "(b.draft = $3 AND $4 = ANY(b.tags) AND b.blog_id <> $5)"
        );
        assert_eq!(strings(&sql), vec!["travel", "alps-xyz"]);
    }

    #[test]
    fn author_and_search() {
        let sql = to_postgres(
            &BlogFilter::Author {
                username: String::from("Jane"),
            },
            1,
        );
        assert_eq!(sql.where_clause, "(b.draft = $1 AND u.username = $2)");
        assert_eq!(strings(&sql), vec!["Jane"]);

        let sql = to_postgres(
            &BlogFilter::Search {
                query: String::from("The Alps"),
            },
            1,
        );
        assert_eq!(
            sql.where_clause,
            "(b.draft = $1 AND strpos(lower(b.title), $2) > 0)"
        );
        assert_eq!(strings(&sql), vec!["the alps"]);
    }
}
