//! End-to-end generation over the fixture manifest

use obsweave::{CancellationToken, GenerationOutput, GeneratorConfig, ManifestHost, Pipeline};
use pretty_assertions::assert_eq;
use std::path::PathBuf;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn host() -> ManifestHost {
    ManifestHost::load(&fixture("app.manifest.yaml")).unwrap()
}

fn generate(config: GeneratorConfig) -> GenerationOutput {
    let host = host();
    let nodes = host.nodes().unwrap();
    Pipeline::new(config)
        .run(&host, &nodes, &CancellationToken::new())
        .unwrap()
}

fn unit<'a>(output: &'a GenerationOutput, hint: &str) -> &'a str {
    output
        .units
        .iter()
        .find(|u| u.hint_name == hint)
        .map(|u| u.source.as_str())
        .unwrap_or_else(|| panic!("missing unit {}", hint))
}

#[test]
fn test_generates_one_unit_per_domain_plus_meters() {
    let output = generate(GeneratorConfig::default());

    let hints: Vec<_> = output.units.iter().map(|u| u.hint_name.as_str()).collect();
    assert_eq!(
        hints,
        vec![
            "Obsweave.Interceptors.Traced.g.cs",
            "Obsweave.Interceptors.Db.g.cs",
            "Obsweave.Interceptors.GenAi.g.cs",
            "Obsweave.Meter.Shop.OrderMetrics.g.cs",
        ]
    );
    // Two scanned sites, three listed-only sites
    assert_eq!(output.candidates, 5);
    // The site in generated source cannot be anchored
    assert_eq!(output.facts, 4);
    assert_eq!(output.faulted, 0);
    assert_eq!(output.meter_classes, 1);
}

#[test]
fn test_wrapper_indices_follow_ordinal_key_order() {
    let output = generate(GeneratorConfig::default());

    // src/Chat.cs < src/Factory.cs < src/Orders.cs:10 < src/Orders.cs:9
    assert!(unit(&output, "Obsweave.Interceptors.GenAi.g.cs").contains("Intercept_GenAi_0("));
    let traced = unit(&output, "Obsweave.Interceptors.Traced.g.cs");
    assert!(traced.contains("Intercept_Traced_1<T>("));
    assert!(traced.contains("Intercept_Traced_3("));
    assert!(unit(&output, "Obsweave.Interceptors.Db.g.cs").contains("Intercept_Db_2("));
}

#[test]
fn test_traced_unit() {
    let output = generate(GeneratorConfig::default());
    let src = unit(&output, "Obsweave.Interceptors.Traced.g.cs");

    assert!(src.starts_with("// <auto-generated/>\n"));
    assert!(src.contains("namespace Obsweave.Generated"));
    assert!(src.contains("file static class TracedInterceptors"));

    // Sanitized source names collide; suffixes follow key order
    assert!(src.contains("ActivitySource MyApp_Orders = new(\"MyApp.Orders\");"));
    assert!(src.contains("ActivitySource MyApp_Orders_1 = new(\"MyApp_Orders\");"));

    // Anchors come from the host
    assert!(src.contains(
        "[global::System.Runtime.CompilerServices.InterceptsLocation(@\"src/Orders.cs\", 9, 36)]"
    ));

    // Async instance call with a nested generic return type
    assert!(src.contains(
        "public static async global::System.Threading.Tasks.Task<global::System.Collections.Generic.Dictionary<string, global::MyApp.Order>> Intercept_Traced_3(this global::MyApp.OrderService @this, string region)"
    ));
    assert!(!src.contains("<Order>"));
    assert!(src.contains(
        "MyApp_Orders_1.StartActivity(\"orders.list\", global::System.Diagnostics.ActivityKind.Server, tags: new[] { new global::System.Collections.Generic.KeyValuePair<string, object?>(\"order.region\", region) });"
    ));
    assert!(src.contains("return await @this.GetOrders(region);"));

    // Static generic call
    assert!(src.contains("public static T Intercept_Traced_1<T>(int count) where T : new()"));
    assert!(src.contains("return global::MyApp.OrderService.Create<T>(count);"));
    assert!(!src.contains("global::T"));
}

#[test]
fn test_database_unit_reports_three_level_descendant() {
    let output = generate(GeneratorConfig::default());
    let src = unit(&output, "Obsweave.Interceptors.Db.g.cs");

    assert!(src.contains("DbActivitySource = new(\"Obsweave.Generated.Database\");"));
    assert!(src.contains("new(\"db.command.type\", \"MyApp.Data.NpgsqlAuditCommand\")"));
    assert!(src.contains("new(\"db.system.name\", \"postgresql\")"));
    assert!(src.contains(
        "public static async global::System.Threading.Tasks.Task<object?> Intercept_Db_2(this global::MyApp.Data.NpgsqlAuditCommand @this)"
    ));
}

#[test]
fn test_genai_unit() {
    let output = generate(GeneratorConfig::default());
    let src = unit(&output, "Obsweave.Interceptors.GenAi.g.cs");

    assert!(src.contains("GenAiActivitySource.StartActivity(\"chat gpt-4o\""));
    assert!(src.contains("new(\"gen_ai.provider.name\", \"openai\")"));
    assert!(src.contains("global::OpenAI.Chat.ChatMessage[] messages"));
    assert!(src.contains(
        "__activity?.SetTag(\"gen_ai.usage.output_tokens\", __result?.Value?.Usage?.OutputTokenCount);"
    ));
}

#[test]
fn test_meter_unit() {
    let output = generate(GeneratorConfig::default());
    let src = unit(&output, "Obsweave.Meter.Shop.OrderMetrics.g.cs");

    assert!(src.contains("Meter s_meter = new(\"Shop.Orders\", \"1.0\");"));
    assert!(src.contains("s_meter.CreateCounter<long>(\"orders.placed\");"));
    assert!(src.contains("s_meter.CreateHistogram<double>(\"orders.amount\", null, \"text\");"));
    assert!(src.contains("public static partial void Amount(double value)"));
    assert!(src.contains("s_amount.Record(value);"));
    assert!(src.contains("s_placed.Add(1);"));
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    let host = host();
    let nodes = host.nodes().unwrap();
    let pipeline = Pipeline::new(GeneratorConfig::default());

    let first = pipeline.run(&host, &nodes, &CancellationToken::new()).unwrap();
    let mut shuffled = nodes.clone();
    shuffled.rotate_left(2);
    shuffled.reverse();
    let second = pipeline.run(&host, &shuffled, &CancellationToken::new()).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_domain_toggles() {
    let config = GeneratorConfig::from_yaml(
        r#"
namespace: Acme.Obs
domains:
  genai: false
  metrics: false
"#,
    )
    .unwrap();
    let output = generate(config);

    let hints: Vec<_> = output.units.iter().map(|u| u.hint_name.as_str()).collect();
    assert_eq!(
        hints,
        vec!["Obsweave.Interceptors.Traced.g.cs", "Obsweave.Interceptors.Db.g.cs"]
    );
    assert!(unit(&output, "Obsweave.Interceptors.Db.g.cs").contains("namespace Acme.Obs"));
    // Indices stay global over the surviving facts
    assert!(unit(&output, "Obsweave.Interceptors.Traced.g.cs").contains("Intercept_Traced_0<T>("));
}

#[test]
fn test_hidden_gate_generates_nothing() {
    let config = GeneratorConfig::from_yaml("markers:\n  gate: MyApp.Missing\n").unwrap();
    let output = generate(config);
    assert!(output.units.is_empty());
    assert_eq!(output.candidates, 0);
}
