//! Scoped, read-only SQL for the agent.
//!
//! The model's statement is parsed and checked before the database sees it:
//! one query, relations limited to `jobs`, `applications`, `users` and the
//! query's own `WITH` names, and calls limited to a fixed set of plain
//! functions. The re-rendered statement then runs inside a `READ ONLY`
//! transaction underneath CTEs with those three names that shadow the real
//! tables with only the rows the hiring manager may see.

use std::collections::BTreeSet;
use std::ops::ControlFlow;

use serde_json::Value;
use sqlparser::ast::{
    Expr, Ident, ObjectName, Query, SetExpr, Statement, TableFactor, Visit, Visitor,
};
use sqlparser::dialect::PostgreSqlDialect;
use sqlparser::parser::Parser;
use sqlx::PgPool;

use crate::agent::ToolResult;
use crate::auth::HiringManagerScope;

pub const MAX_QUERY_ROWS: i64 = 100;

const SCOPED_TABLES: [&str; 3] = ["jobs", "applications", "users"];

/// Functions that compute over their arguments and nothing else.
const ALLOWED_FUNCTIONS: &[&str] = &[
    "abs",
    "age",
    "array_agg",
    "avg",
    "bool_and",
    "bool_or",
    "ceil",
    "coalesce",
    "concat",
    "count",
    "current_date",
    "current_timestamp",
    "date_part",
    "date_trunc",
    "dense_rank",
    "floor",
    "greatest",
    "initcap",
    "least",
    "left",
    "length",
    "lower",
    "max",
    "min",
    "now",
    "nullif",
    "rank",
    "replace",
    "right",
    "round",
    "row_number",
    "split_part",
    "string_agg",
    "substr",
    "sum",
    "to_char",
    "trim",
    "upper",
];

const SHADOW_TABLES: &str = r#"
WITH jobs AS (
    SELECT * FROM public.jobs WHERE hiring_manager_id = $1
),
applications AS (
    SELECT a.*
    FROM public.applications a
    JOIN public.jobs j ON j.id = a.job_id
    WHERE j.hiring_manager_id = $1
),
users AS (
    SELECT u.id, u.email, u.role, u.created_at, u.updated_at
    FROM public.users u
    WHERE u.id = $1
       OR u.id IN (
           SELECT a.applicant_id
           FROM public.applications a
           JOIN public.jobs j ON j.id = a.job_id
           WHERE j.hiring_manager_id = $1
       )
)"#;

const USE_TABLES_DIRECTLY: &str = "Refer to the users, jobs and applications tables directly.";

/// A statement that passed the checks, rendered back from its syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedQuery {
    pub statement: String,
    /// `WITH` names the statement defines itself, other than the three scoped tables.
    pub local_names: Vec<String>,
}

/// Identifier as Postgres resolves it: unquoted names fold to lower case.
fn resolved(ident: &Ident) -> String {
    match ident.quote_style {
        Some(_) => ident.value.clone(),
        None => ident.value.to_lowercase(),
    }
}

fn unqualified(name: &ObjectName) -> Option<String> {
    match name.0.as_slice() {
        [ident] => Some(resolved(ident)),
        _ => None,
    }
}

/// `TABLE name` carries its relation as a bare string the visitor never reports.
fn uses_table_shorthand(body: &SetExpr) -> bool {
    match body {
        SetExpr::Table(_) => true,
        SetExpr::SetOperation { left, right, .. } => {
            uses_table_shorthand(left) || uses_table_shorthand(right)
        }
        _ => false,
    }
}

#[derive(Default)]
struct ReadQueryCheck {
    local_names: BTreeSet<String>,
    relations: Vec<String>,
}

impl Visitor for ReadQueryCheck {
    type Break = String;

    fn pre_visit_query(&mut self, query: &Query) -> ControlFlow<String> {
        if uses_table_shorthand(&query.body) {
            return ControlFlow::Break(format!(
                "Query rejected: TABLE is not allowed. {USE_TABLES_DIRECTLY}"
            ));
        }
        if let Some(with) = &query.with {
            self.local_names
                .extend(with.cte_tables.iter().map(|cte| resolved(&cte.alias.name)));
        }
        ControlFlow::Continue(())
    }

    fn pre_visit_table_factor(&mut self, factor: &TableFactor) -> ControlFlow<String> {
        match factor {
            TableFactor::Table { args: Some(_), name, .. } => ControlFlow::Break(format!(
                "Query rejected: table function '{name}' is not allowed. {USE_TABLES_DIRECTLY}"
            )),
            TableFactor::Table { .. }
            | TableFactor::Derived { .. }
            | TableFactor::NestedJoin { .. }
            | TableFactor::UNNEST { .. } => ControlFlow::Continue(()),
            other => ControlFlow::Break(format!(
                "Query rejected: '{other}' is not allowed. {USE_TABLES_DIRECTLY}"
            )),
        }
    }

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<String> {
        match unqualified(relation) {
            Some(name) => {
                self.relations.push(name);
                ControlFlow::Continue(())
            }
            None => ControlFlow::Break(format!(
                "Query rejected: '{relation}' is not allowed. {USE_TABLES_DIRECTLY}"
            )),
        }
    }

    fn pre_visit_expr(&mut self, expr: &Expr) -> ControlFlow<String> {
        if let Expr::Function(function) = expr {
            let allowed = unqualified(&function.name)
                .is_some_and(|name| ALLOWED_FUNCTIONS.contains(&name.as_str()));
            if !allowed {
                return ControlFlow::Break(format!(
                    "Query rejected: function '{}' is not allowed.",
                    function.name
                ));
            }
        }
        ControlFlow::Continue(())
    }
}

/// Parses the model's statement and checks everything it could reach.
pub fn guard_read_query(sql: &str) -> Result<GuardedQuery, String> {
    let mut statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
        .map_err(|e| format!("Could not parse query: {e}"))?;

    let statement = match statements.len() {
        0 => return Err("Query is empty.".to_string()),
        1 => statements.remove(0),
        _ => return Err("Only a single statement is allowed.".to_string()),
    };
    if !matches!(statement, Statement::Query(_)) {
        return Err("Only SELECT queries are allowed here. \
             Use the provided tools to create, update or delete data."
            .to_string());
    }

    let mut check = ReadQueryCheck::default();
    if let ControlFlow::Break(reason) = statement.visit(&mut check) {
        return Err(reason);
    }

    if let Some(unknown) = check.relations.iter().find(|name| {
        !SCOPED_TABLES.contains(&name.as_str()) && !check.local_names.contains(*name)
    }) {
        return Err(format!("Query rejected: '{unknown}' is not allowed. {USE_TABLES_DIRECTLY}"));
    }

    Ok(GuardedQuery {
        statement: statement.to_string(),
        local_names: check
            .local_names
            .into_iter()
            .filter(|name| !SCOPED_TABLES.contains(&name.as_str()))
            .collect(),
    })
}

/// Wraps a guarded statement so it sees only the scoped tables and returns JSON.
pub fn scoped_statement(statement: &str) -> String {
    format!(
        "{SHADOW_TABLES}\nSELECT COALESCE(json_agg(row_to_json(q)), '[]'::json)\n\
         FROM (SELECT * FROM (\n{statement}\n) AS scoped_q LIMIT {MAX_QUERY_ROWS}) AS q"
    )
}

pub async fn run_scoped_query(pool: &PgPool, scope: HiringManagerScope, sql: &str) -> ToolResult {
    let guarded = guard_read_query(sql)?;
    let wrapped = scoped_statement(&guarded.statement);

    let rows: Result<Result<Value, String>, sqlx::Error> = async {
        let mut tx = pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        sqlx::query("SET LOCAL statement_timeout = '5s'")
            .execute(&mut *tx)
            .await?;

        // A WITH name that is also a real relation would reach that relation
        // wherever the WITH is out of scope.
        for name in &guarded.local_names {
            let taken: bool = sqlx::query_scalar("SELECT to_regclass(quote_ident($1)) IS NOT NULL")
                .bind(name)
                .fetch_one(&mut *tx)
                .await?;
            if taken {
                return Ok(Err(format!(
                    "Query rejected: '{name}' names an existing relation; choose another WITH name."
                )));
            }
        }

        let rows = sqlx::query_scalar::<_, Value>(&wrapped)
            .bind(scope.id())
            .fetch_one(&mut *tx)
            .await?;
        tx.rollback().await?;
        Ok(Ok(rows))
    }
    .await;

    let rows = rows.map_err(|e| format!("Error running query: {e}"))??;
    Ok(rows.to_string())
}


/// Needs a live Postgres via `DATABASE_URL`: `cargo test -- --ignored`.
#[cfg(test)]
mod pg_tests {
    use super::*;
    use crate::jobs::repo::{insert_job, NewJob};
    use crate::models::user::Role;
    use crate::users::repo::insert_user;

    const M1_HASH: &str = "SECRET-HASH-M1";

    /// M1 owns "Backend Engineer"; M2 owns nothing. Returns M2's scope.
    async fn second_manager_beside_a_posting(pool: &PgPool) -> HiringManagerScope {
        let m1 = insert_user(pool, "m1@example.com", M1_HASH, Role::HiringManager)
            .await
            .unwrap();
        let m2 = insert_user(pool, "m2@example.com", "SECRET-HASH-M2", Role::HiringManager)
            .await
            .unwrap();
        insert_job(
            pool,
            m1.id,
            &NewJob {
                title: "Backend Engineer",
                description: "Rust services",
                location: "Remote",
                salary: None,
            },
        )
        .await
        .unwrap();
        HiringManagerScope::trusted(m2.id)
    }

    fn assert_nothing_of_m1(sql: &str, result: &ToolResult) {
        let text = match result {
            Ok(text) | Err(text) => text,
        };
        for secret in ["Backend Engineer", "m1@example.com", M1_HASH, "password_hash\":"] {
            assert!(!text.contains(secret), "{sql} leaked {secret}: {text}");
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_hostile_queries_see_nothing_of_another_manager(pool: PgPool) {
        let m2 = second_manager_beside_a_posting(&pool).await;

        for sql in [
            r#"SELECT title FROM "public"."jobs""#,
            r#"SELECT title FROM "public".jobs"#,
            "SELECT query_to_xml('select email, password_hash from users', true, false, '') AS x",
            "SELECT query_to_xmlschema('select * from jobs', true, false, '') AS x",
            "SELECT current_setting('search_path') AS s",
            "SELECT set_config('search_path', 'pg_catalog', true) AS s",
            "SELECT (SELECT password_hash FROM users LIMIT 1) AS h",
            "SELECT email, (SELECT string_agg(password_hash, ',') FROM users) AS h FROM users",
            "SELECT title FROM jobs",
            "SELECT * FROM users",
        ] {
            let result = run_scoped_query(&pool, m2, sql).await;
            assert_nothing_of_m1(sql, &result);
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_with_name_of_a_real_relation_is_refused(pool: PgPool) {
        let m2 = second_manager_beside_a_posting(&pool).await;

        let sql = "SELECT * FROM _sqlx_migrations, \
                   (WITH _sqlx_migrations AS (SELECT 1 AS x) SELECT * FROM _sqlx_migrations) t";
        let err = run_scoped_query(&pool, m2, sql).await.unwrap_err();
        assert!(err.contains("names an existing relation"), "{err}");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore]
    async fn test_own_rows_remain_visible(pool: PgPool) {
        let m2 = second_manager_beside_a_posting(&pool).await;

        let own = run_scoped_query(&pool, m2, "SELECT email FROM users").await.unwrap();
        assert_eq!(own, r#"[{"email":"m2@example.com"}]"#);
    }
}
