//! Provider registry - catalog of known database and generative-AI libraries
//!
//! The registry is an immutable table. It is built once (from the built-in
//! entries plus any extra entries in the config) and then passed by reference
//! to the classifiers.
//!
//! ## Matching policy
//!
//! [`ProviderRegistry::provider_id`] returns the **first declared** entry
//! whose matcher is a **case-insensitive substring** of the type name. A short
//! matcher can therefore claim unrelated types that merely contain it, and
//! entries with overlapping matchers must be declared most-specific first
//! (`AzureOpenAI` before `OpenAI`). Extra entries from the config are
//! appended after the built-ins and never shadow them.

use crate::model::TokenUsagePaths;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProviderCategory {
    GenAi,
    Database,
}

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProviderDefinition {
    pub category: ProviderCategory,
    /// Provider id reported in generated telemetry, e.g. `postgresql`
    pub id: String,
    /// Identity of the library that ships the client
    pub library: String,
    /// Canonical client type
    pub canonical_type: String,
    /// Substring tested against declaring type names
    pub matcher: String,
    #[serde(default)]
    pub operations: Vec<String>,
    #[serde(default, skip_serializing_if = "TokenUsagePaths::is_empty")]
    pub token_usage: TokenUsagePaths,
}

/// Provider detected among the build's referenced libraries
pub type ProviderInfo<'a> = &'a ProviderDefinition;

#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    entries: Vec<ProviderDefinition>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ProviderRegistry {
    /// Registry holding exactly `entries`, in order
    pub fn new(entries: Vec<ProviderDefinition>) -> Self {
        Self { entries }
    }

    /// The built-in catalog
    pub fn builtin() -> Self {
        Self::new(builtin_entries())
    }

    /// Built-in catalog followed by `extra`
    pub fn with_extra(extra: &[ProviderDefinition]) -> Self {
        let mut entries = builtin_entries();
        entries.extend(extra.iter().cloned());
        Self::new(entries)
    }

    pub fn entries(&self) -> &[ProviderDefinition] {
        &self.entries
    }

    /// Entries whose library identity is among `referenced`
    pub fn detect_providers<S: AsRef<str>>(&self, referenced: &[S]) -> Vec<ProviderInfo<'_>> {
        let refs: HashSet<&str> = referenced.iter().map(|s| s.as_ref()).collect();
        self.entries
            .iter()
            .filter(|e| refs.contains(e.library.as_str()))
            .collect()
    }

    pub fn has_genai_providers<S: AsRef<str>>(&self, referenced: &[S]) -> bool {
        self.has_category(referenced, ProviderCategory::GenAi)
    }

    pub fn has_database_providers<S: AsRef<str>>(&self, referenced: &[S]) -> bool {
        self.has_category(referenced, ProviderCategory::Database)
    }

    fn has_category<S: AsRef<str>>(&self, referenced: &[S], category: ProviderCategory) -> bool {
        self.detect_providers(referenced)
            .iter()
            .any(|p| p.category == category)
    }

    /// First declared entry whose matcher occurs in `type_name`, ignoring case
    pub fn find(&self, type_name: &str) -> Option<&ProviderDefinition> {
        let haystack = type_name.to_lowercase();
        self.entries
            .iter()
            .find(|e| haystack.contains(&e.matcher.to_lowercase()))
    }

    pub fn provider_id(&self, type_name: &str) -> Option<&str> {
        self.find(type_name).map(|e| e.id.as_str())
    }
}

fn entry(
    category: ProviderCategory,
    id: &str,
    library: &str,
    canonical_type: &str,
    matcher: &str,
    operations: &[&str],
    token_usage: Option<(&str, &str)>,
) -> ProviderDefinition {
    ProviderDefinition {
        category,
        id: id.into(),
        library: library.into(),
        canonical_type: canonical_type.into(),
        matcher: matcher.into(),
        operations: operations.iter().map(|s| s.to_string()).collect(),
        token_usage: token_usage
            .map(|(input, output)| TokenUsagePaths {
                input: Some(input.into()),
                output: Some(output.into()),
            })
            .unwrap_or_default(),
    }
}

fn builtin_entries() -> Vec<ProviderDefinition> {
    use ProviderCategory::{Database, GenAi};

    const DB_OPS: &[&str] = &["read", "non_query", "scalar"];

    vec![
        // GenAI - Azure before OpenAI: "OpenAI" is a substring of "AzureOpenAI"
        entry(
            GenAi,
            "az.ai.openai",
            "Azure.AI.OpenAI",
            "Azure.AI.OpenAI.AzureOpenAIClient",
            "AzureOpenAI",
            &["chat", "embeddings"],
            Some(("Value.Usage.InputTokenCount", "Value.Usage.OutputTokenCount")),
        ),
        entry(
            GenAi,
            "openai",
            "OpenAI",
            "OpenAI.Chat.ChatClient",
            "OpenAI",
            &["chat", "embeddings"],
            Some(("Value.Usage.InputTokenCount", "Value.Usage.OutputTokenCount")),
        ),
        entry(
            GenAi,
            "anthropic",
            "Anthropic.SDK",
            "Anthropic.SDK.Messaging.MessagesEndpoint",
            "Anthropic",
            &["chat"],
            Some(("Usage.InputTokens", "Usage.OutputTokens")),
        ),
        entry(
            GenAi,
            "ollama",
            "OllamaSharp",
            "OllamaSharp.OllamaApiClient",
            "Ollama",
            &["chat", "text_completion", "embeddings"],
            None,
        ),
        entry(
            GenAi,
            "microsoft.extensions.ai",
            "Microsoft.Extensions.AI.Abstractions",
            "Microsoft.Extensions.AI.IChatClient",
            "Microsoft.Extensions.AI",
            &["chat", "embeddings"],
            Some(("Usage.InputTokenCount", "Usage.OutputTokenCount")),
        ),
        // Database
        entry(
            Database,
            "postgresql",
            "Npgsql",
            "Npgsql.NpgsqlCommand",
            "Npgsql",
            DB_OPS,
            None,
        ),
        entry(
            Database,
            "microsoft.sql_server",
            "Microsoft.Data.SqlClient",
            "Microsoft.Data.SqlClient.SqlCommand",
            "SqlClient",
            DB_OPS,
            None,
        ),
        entry(
            Database,
            "sqlite",
            "Microsoft.Data.Sqlite",
            "Microsoft.Data.Sqlite.SqliteCommand",
            "Sqlite",
            DB_OPS,
            None,
        ),
        entry(
            Database,
            "mysql",
            "MySqlConnector",
            "MySqlConnector.MySqlCommand",
            "MySql",
            DB_OPS,
            None,
        ),
        entry(
            Database,
            "oracle.db",
            "Oracle.ManagedDataAccess",
            "Oracle.ManagedDataAccess.Client.OracleCommand",
            "Oracle",
            DB_OPS,
            None,
        ),
        entry(
            Database,
            "duckdb",
            "DuckDB.NET.Data",
            "DuckDB.NET.Data.DuckDBCommand",
            "DuckDB",
            DB_OPS,
            None,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Npgsql.NpgsqlCommand", Some("postgresql"))]
    #[case("Microsoft.Data.SqlClient.SqlCommand", Some("microsoft.sql_server"))]
    #[case("MICROSOFT.DATA.SQLITE.SQLITECOMMAND", Some("sqlite"))]
    #[case("Azure.AI.OpenAI.AzureOpenAIClient", Some("az.ai.openai"))]
    #[case("OpenAI.Chat.ChatClient", Some("openai"))]
    #[case("Microsoft.Extensions.AI.IChatClient", Some("microsoft.extensions.ai"))]
    #[case("System.Data.Common.DbCommand", None)]
    fn test_provider_id(#[case] type_name: &str, #[case] expected: Option<&str>) {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.provider_id(type_name), expected);
    }

    #[test]
    fn test_substring_match_is_unanchored() {
        // First declared match, substring containment: an unrelated type that
        // happens to contain a matcher is claimed by that provider
        let registry = ProviderRegistry::builtin();
        assert_eq!(
            registry.provider_id("MyApp.Caching.SqliteBackedCache"),
            Some("sqlite")
        );
    }

    #[test]
    fn test_detect_providers() {
        let registry = ProviderRegistry::builtin();
        let refs = vec!["Npgsql", "Newtonsoft.Json"];

        let detected = registry.detect_providers(&refs);
        assert_eq!(detected.len(), 1);
        assert_eq!(detected[0].id, "postgresql");

        assert!(registry.has_database_providers(&refs));
        assert!(!registry.has_genai_providers(&refs));
        assert!(registry.has_genai_providers(&["OpenAI"]));
    }

    #[test]
    fn test_extra_entries_follow_builtins() {
        let extra = ProviderDefinition {
            category: ProviderCategory::Database,
            id: "custom.npgsql".into(),
            library: "Custom.Npgsql".into(),
            canonical_type: "Custom.NpgsqlCommand".into(),
            matcher: "Npgsql".into(),
            operations: vec![],
            token_usage: TokenUsagePaths::default(),
        };
        let registry = ProviderRegistry::with_extra(&[extra]);
        // Built-in entry is declared first and wins
        assert_eq!(registry.provider_id("Custom.NpgsqlCommand"), Some("postgresql"));
        assert!(registry.has_database_providers(&["Custom.Npgsql"]));
    }
}
