//! Generative-AI classifier - calls on known client libraries
//!
//! Client types are recognized by exact name **prefix** (so generic
//! instantiations like `IEmbeddingGenerator<string, Embedding<float>>` still
//! match). The provider id then comes from the registry's substring matcher.

use super::{call_shape, ClassifyContext, Classifier};
use crate::error::Result;
use crate::host::{Argument, CancellationToken, ResolvedCall};
use crate::model::{Domain, GenAiInvocation, Invocation};

/// Provider id recorded when a client matched but the registry has no entry
pub const UNKNOWN_PROVIDER: &str = "unknown";

/// Parameter names that carry the model identifier
const MODEL_PARAMETERS: &[&str] = &["model", "modelId", "deploymentName"];

struct ClientMethod {
    name: &'static str,
    operation: &'static str,
    is_async: bool,
}

const fn m(name: &'static str, operation: &'static str, is_async: bool) -> ClientMethod {
    ClientMethod {
        name,
        operation,
        is_async,
    }
}

/// Client type prefix → intercepted methods
const CLIENTS: &[(&str, &[ClientMethod])] = &[
    (
        "OpenAI.Chat.ChatClient",
        &[m("CompleteChat", "chat", false), m("CompleteChatAsync", "chat", true)],
    ),
    (
        "OpenAI.Embeddings.EmbeddingClient",
        &[
            m("GenerateEmbedding", "embeddings", false),
            m("GenerateEmbeddingAsync", "embeddings", true),
            m("GenerateEmbeddings", "embeddings", false),
            m("GenerateEmbeddingsAsync", "embeddings", true),
        ],
    ),
    (
        "Anthropic.SDK.Messaging.MessagesEndpoint",
        &[m("GetClaudeMessageAsync", "chat", true)],
    ),
    (
        "OllamaSharp.OllamaApiClient",
        &[m("EmbedAsync", "embeddings", true)],
    ),
    (
        "Microsoft.Extensions.AI.IChatClient",
        &[m("GetResponseAsync", "chat", true)],
    ),
    (
        "Microsoft.Extensions.AI.IEmbeddingGenerator",
        &[m("GenerateAsync", "embeddings", true)],
    ),
];

pub struct GenAiClassifier;

impl Classifier for GenAiClassifier {
    fn domain(&self) -> Domain {
        Domain::GenAi
    }

    fn classify(
        &self,
        call: &ResolvedCall,
        ctx: &ClassifyContext<'_>,
        _cancel: &CancellationToken,
    ) -> Result<Option<Invocation>> {
        let method = &call.method;
        let type_name = method.containing_type.as_str();

        let Some(client) = CLIENTS
            .iter()
            .find(|(prefix, _)| type_name.starts_with(prefix))
            .and_then(|(_, methods)| methods.iter().find(|cm| cm.name == method.name))
        else {
            return Ok(None);
        };

        let provider = ctx.registry.find(type_name);

        Ok(Some(Invocation::GenAi(GenAiInvocation {
            operation: client.operation.to_string(),
            provider_id: provider
                .map(|p| p.id.clone())
                .unwrap_or_else(|| UNKNOWN_PROVIDER.to_string()),
            model: static_model(&call.arguments),
            token_usage: provider.map(|p| p.token_usage.clone()).unwrap_or_default(),
            shape: call_shape(method, client.is_async),
        })))
    }
}

/// Model name passed as a compile-time constant, if any
fn static_model(arguments: &[Argument]) -> Option<String> {
    arguments
        .iter()
        .filter(|a| MODEL_PARAMETERS.contains(&a.parameter.as_str()))
        .find_map(|a| a.constant.as_ref()?.as_str().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::testing::FakeModel;
    use crate::config::MarkerConfig;
    use crate::host::{ConstantValue, MethodSymbol};
    use crate::providers::ProviderRegistry;

    fn run(method: MethodSymbol, arguments: Vec<Argument>) -> Option<GenAiInvocation> {
        let model = FakeModel::default();
        let registry = ProviderRegistry::builtin();
        let markers = MarkerConfig::default();
        let ctx = ClassifyContext {
            model: &model,
            registry: &registry,
            markers: &markers,
            inherit_traced: true,
        };
        let call = ResolvedCall { method, arguments };
        match GenAiClassifier
            .classify(&call, &ctx, &CancellationToken::new())
            .unwrap()
        {
            Some(Invocation::GenAi(g)) => Some(g),
            _ => None,
        }
    }

    fn arg(parameter: &str, constant: Option<ConstantValue>) -> Argument {
        Argument {
            parameter: parameter.into(),
            constant,
        }
    }

    #[test]
    fn test_openai_chat_with_token_usage() {
        let genai = run(
            MethodSymbol::new("CompleteChatAsync", "OpenAI.Chat.ChatClient"),
            vec![arg("messages", None)],
        )
        .unwrap();

        assert_eq!(genai.operation, "chat");
        assert_eq!(genai.provider_id, "openai");
        assert!(genai.shape.is_async);
        assert_eq!(
            genai.token_usage.input.as_deref(),
            Some("Value.Usage.InputTokenCount")
        );
        assert_eq!(genai.model, None);
    }

    #[test]
    fn test_prefix_matches_generic_instantiation() {
        let genai = run(
            MethodSymbol::new(
                "GenerateAsync",
                "Microsoft.Extensions.AI.IEmbeddingGenerator<string, Microsoft.Extensions.AI.Embedding<float>>",
            ),
            vec![],
        )
        .unwrap();
        assert_eq!(genai.operation, "embeddings");
        assert_eq!(genai.provider_id, "microsoft.extensions.ai");
    }

    #[test]
    fn test_static_model_argument() {
        let genai = run(
            MethodSymbol::new("EmbedAsync", "OllamaSharp.OllamaApiClient"),
            vec![
                arg("input", Some(ConstantValue::Str("hello".into()))),
                arg("model", Some(ConstantValue::Str("nomic-embed-text".into()))),
            ],
        )
        .unwrap();
        assert_eq!(genai.model.as_deref(), Some("nomic-embed-text"));
        assert_eq!(genai.provider_id, "ollama");
        assert!(genai.token_usage.is_empty());
    }

    #[test]
    fn test_non_constant_model_is_ignored() {
        let genai = run(
            MethodSymbol::new("GetResponseAsync", "Microsoft.Extensions.AI.IChatClient"),
            vec![
                arg("modelId", None),
                arg("deploymentName", Some(ConstantValue::Int(4))),
            ],
        )
        .unwrap();
        assert_eq!(genai.model, None);
    }

    #[test]
    fn test_non_matches() {
        // Known client, unknown method
        assert!(run(MethodSymbol::new("Dispose", "OpenAI.Chat.ChatClient"), vec![]).is_none());
        // Prefix is exact, not substring
        assert!(run(
            MethodSymbol::new("CompleteChat", "MyApp.Wrappers.OpenAI.Chat.ChatClient"),
            vec![]
        )
        .is_none());
    }

    #[test]
    fn test_unknown_provider_fallback() {
        let model = FakeModel::default();
        let registry = ProviderRegistry::new(Vec::new());
        let markers = MarkerConfig::default();
        let ctx = ClassifyContext {
            model: &model,
            registry: &registry,
            markers: &markers,
            inherit_traced: true,
        };
        let call = ResolvedCall {
            method: MethodSymbol::new("CompleteChat", "OpenAI.Chat.ChatClient"),
            arguments: vec![],
        };
        let Some(Invocation::GenAi(genai)) = GenAiClassifier
            .classify(&call, &ctx, &CancellationToken::new())
            .unwrap()
        else {
            panic!("expected a GenAI match");
        };
        assert_eq!(genai.provider_id, UNKNOWN_PROVIDER);
    }
}
