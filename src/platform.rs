use crate::translation::LiteralSyntax;
use crate::types::Backend;

/// Dialect collaborator: the only SQL text the core needs a backend to spell.
pub trait Platform: Send + Sync {
    fn backend(&self) -> Backend;

    fn supports_savepoints(&self) -> bool {
        true
    }

    fn supports_release_savepoints(&self) -> bool {
        self.supports_savepoints()
    }

    fn create_savepoint_sql(&self, name: &str) -> String {
        format!("SAVEPOINT {name}")
    }

    fn release_savepoint_sql(&self, name: &str) -> String {
        format!("RELEASE SAVEPOINT {name}")
    }

    fn rollback_savepoint_sql(&self, name: &str) -> String {
        format!("ROLLBACK TO SAVEPOINT {name}")
    }

    /// Literal rules the placeholder scanner uses for this dialect.
    fn literal_syntax(&self) -> LiteralSyntax {
        LiteralSyntax::for_backend(self.backend())
    }
}

/// Built-in platform with the savepoint dialect each backend family uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardPlatform {
    backend: Backend,
    literal_syntax: LiteralSyntax,
}

impl StandardPlatform {
    #[must_use]
    pub fn new(backend: Backend) -> Self {
        Self {
            backend,
            literal_syntax: LiteralSyntax::for_backend(backend),
        }
    }

    #[must_use]
    pub fn with_literal_syntax(mut self, literal_syntax: LiteralSyntax) -> Self {
        self.literal_syntax = literal_syntax;
        self
    }

    fn uses_save_transaction(&self) -> bool {
        matches!(self.backend, Backend::Mssql | Backend::Sybase)
    }
}

impl Platform for StandardPlatform {
    fn backend(&self) -> Backend {
        self.backend
    }

    fn supports_release_savepoints(&self) -> bool {
        !matches!(
            self.backend,
            Backend::Mssql | Backend::Sybase | Backend::Oracle
        )
    }

    fn create_savepoint_sql(&self, name: &str) -> String {
        match self.backend {
            Backend::Mssql | Backend::Sybase => format!("SAVE TRANSACTION {name}"),
            Backend::Db2 => format!("SAVEPOINT {name} ON ROLLBACK RETAIN CURSORS"),
            _ => format!("SAVEPOINT {name}"),
        }
    }

    fn rollback_savepoint_sql(&self, name: &str) -> String {
        if self.uses_save_transaction() {
            format!("ROLLBACK TRANSACTION {name}")
        } else {
            format!("ROLLBACK TO SAVEPOINT {name}")
        }
    }

    fn literal_syntax(&self) -> LiteralSyntax {
        self.literal_syntax
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ansi_savepoints_by_default() {
        let pg = StandardPlatform::new(Backend::Postgres);
        assert!(pg.supports_savepoints());
        assert!(pg.supports_release_savepoints());
        assert_eq!(pg.create_savepoint_sql("SP_2"), "SAVEPOINT SP_2");
        assert_eq!(pg.release_savepoint_sql("SP_2"), "RELEASE SAVEPOINT SP_2");
        assert_eq!(pg.rollback_savepoint_sql("SP_2"), "ROLLBACK TO SAVEPOINT SP_2");
    }

    #[test]
    fn sql_server_uses_save_transaction_without_release() {
        let mssql = StandardPlatform::new(Backend::Mssql);
        assert!(!mssql.supports_release_savepoints());
        assert_eq!(mssql.create_savepoint_sql("SP_2"), "SAVE TRANSACTION SP_2");
        assert_eq!(mssql.rollback_savepoint_sql("SP_2"), "ROLLBACK TRANSACTION SP_2");
    }

    #[test]
    fn oracle_has_no_release_and_db2_retains_cursors() {
        assert!(!StandardPlatform::new(Backend::Oracle).supports_release_savepoints());
        assert_eq!(
            StandardPlatform::new(Backend::Db2).create_savepoint_sql("S"),
            "SAVEPOINT S ON ROLLBACK RETAIN CURSORS"
        );
    }
}
