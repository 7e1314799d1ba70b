//! Fixture registries and documents shared by the analysis and server tests.

use crate::document::DocumentContext;
use crate::registry::{
    AnnotationType, FilterField, FunctionDefinition, InMemoryRegistry, LinkAnnotationDefinition,
    LinkDefinition, LinkSide, Registries, SpecSchema, TypeDescription,
};
use blueprint_model::{BlueprintLoader, DocumentFormat, SerdeLoader, SourcePosition};
use lsp_types::Url;
use std::collections::BTreeMap;

pub const FUNCTION_TYPE: &str = "aws/lambda/function";
pub const TABLE_TYPE: &str = "aws/dynamodb/table";
pub const VPC_TYPE: &str = "aws/vpc";

pub const SAMPLE_YAML: &str = r#"version: 2025-05-12
variables:
  region:
    type: string
    allowedValues: [eu-west-1, us-east-1]
  debug:
    type: boolean
values:
  config:
    type: object
    value:
      api:
        url: https://example.com
      retries: 3
include:
  core:
    path: ./core.blueprint.yml
datasources:
  network:
    type: aws/vpc
    exports:
      vpcId:
        type: string
        aliasFor: vpcId
resources:
  ordersTable:
    type: aws/dynamodb/table
    metadata:
      labels:
        app: orders
    spec:
      tableName: orders
  ordersHandler:
    type: aws/lambda/function
    metadata:
      labels:
        app: orders
    linkSelector:
      byLabel:
        app: orders
    spec:
      handler: index.handler
exports:
  tableName:
    type: string
    field: resources.ordersTable.spec.tableName
"#;

fn table_spec() -> SpecSchema {
    SpecSchema::object([
        ("tableName", SpecSchema::string().with_description("Name of the table.")),
        (
            "billingMode",
            SpecSchema::string().with_allowed_values(["PAY_PER_REQUEST", "PROVISIONED"]),
        ),
        (
            "keySchema",
            SpecSchema::array(SpecSchema::object([
                ("attributeName", SpecSchema::string()),
                ("keyType", SpecSchema::string().with_allowed_values(["HASH", "RANGE"])),
            ])),
        ),
        ("pointInTimeRecovery", SpecSchema::boolean()),
        ("tags", SpecSchema::map(SpecSchema::string())),
    ])
}

fn function_spec() -> SpecSchema {
    SpecSchema::object([
        ("handler", SpecSchema::string()),
        (
            "runtime",
            SpecSchema::string().with_allowed_values(["nodejs20.x", "python3.12"]),
        ),
        (
            "environment",
            SpecSchema::object([("variables", SpecSchema::map(SpecSchema::string()))]),
        ),
    ])
}

fn annotation(
    name: &str,
    annotation_type: AnnotationType,
    allowed_values: &[&str],
    applies_to: LinkSide,
) -> LinkAnnotationDefinition {
    LinkAnnotationDefinition {
        name: name.to_string(),
        label: None,
        description: None,
        annotation_type,
        allowed_values: allowed_values.iter().map(|value| value.to_string()).collect(),
        default_value: None,
        required: false,
        applies_to,
    }
}

/// The function-to-table link with annotations for both sides.
pub fn function_table_link() -> LinkDefinition {
    let definitions = [
        (
            format!("{FUNCTION_TYPE}::aws.lambda.dynamodb.accessType"),
            annotation(
                "aws.lambda.dynamodb.accessType",
                AnnotationType::String,
                &["read", "write", "readwrite"],
                LinkSide::A,
            ),
        ),
        (
            format!("{FUNCTION_TYPE}::aws.lambda.dynamodb.<tableName>.accessType"),
            annotation(
                "aws.lambda.dynamodb.<tableName>.accessType",
                AnnotationType::String,
                &["read", "write"],
                LinkSide::A,
            ),
        ),
        (
            format!("{TABLE_TYPE}::aws.dynamodb.stream.enabled"),
            annotation(
                "aws.dynamodb.stream.enabled",
                AnnotationType::Boolean,
                &[],
                LinkSide::B,
            ),
        ),
    ];
    LinkDefinition {
        resource_type_a: FUNCTION_TYPE.to_string(),
        resource_type_b: TABLE_TYPE.to_string(),
        annotation_definitions: BTreeMap::from(definitions),
    }
}

/// An in-memory registry with a table, a function, a VPC data source, a custom variable
/// type, a few functions and a link between the function and the table.
pub fn sample_registry() -> InMemoryRegistry {
    InMemoryRegistry::new()
        .with_resource_type(
            TABLE_TYPE,
            Some(table_spec()),
            Some(TypeDescription {
                markdown: Some("**DynamoDB table**".into()),
                ..TypeDescription::default()
            }),
        )
        .with_resource_type(
            FUNCTION_TYPE,
            Some(function_spec()),
            Some(TypeDescription::summary("A Lambda function.")),
        )
        .with_data_source_type(
            VPC_TYPE,
            [
                (
                    "tags".to_string(),
                    FilterField {
                        field_type: "map".into(),
                        description: None,
                    },
                ),
                (
                    "vpcId".to_string(),
                    FilterField {
                        field_type: "string".into(),
                        description: Some("The VPC ID.".into()),
                    },
                ),
            ],
            [
                ("vpcId".to_string(), SpecSchema::string()),
                ("subnetIds".to_string(), SpecSchema::array(SpecSchema::string())),
            ],
            None,
        )
        .with_variable_type("aws/region", Some(TypeDescription::summary("An AWS region.")))
        .with_function(FunctionDefinition {
            name: "len".into(),
            summary: "Length of a string or list.".into(),
            signature: Some("len(value) -> integer".into()),
            description: None,
        })
        .with_function(FunctionDefinition {
            name: "join".into(),
            summary: "Join strings with a delimiter.".into(),
            signature: None,
            description: None,
        })
        .with_link(function_table_link())
}

pub fn sample_registries() -> Registries {
    Registries::from_memory(sample_registry())
}

pub fn sample_uri(format: DocumentFormat) -> Url {
    let name = match format {
        DocumentFormat::Yaml => "file:///workspace/app.blueprint.yml",
        DocumentFormat::Jsonc => "file:///workspace/app.blueprint.jsonc",
    };
    Url::parse(name).expect("fixture uri")
}

/// Load `content` with the default loader.
pub fn document(content: &str, format: DocumentFormat) -> DocumentContext {
    document_at(sample_uri(format), content, format)
}

pub fn document_at(uri: Url, content: &str, format: DocumentFormat) -> DocumentContext {
    let loaded = SerdeLoader::new().load(content, format);
    DocumentContext::new(uri, content.to_string(), format, loaded)
}

/// Split a `|` cursor marker out of `source`, returning the text and the 1-indexed cursor.
pub fn with_cursor(source: &str) -> (String, SourcePosition) {
    let offset = source.find('|').expect("cursor marker");
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().unwrap_or_default().chars().count() + 1;
    (source.replacen('|', "", 1), SourcePosition::new(line, column))
}

/// [`SAMPLE_YAML`] with `edit` appended, which is where most tests put the cursor.
pub fn sample_with(edit: &str) -> String {
    format!("{SAMPLE_YAML}{edit}")
}

/// A document being edited at the `|` marker. When the edited text does not load, the
/// structure of [`SAMPLE_YAML`] stands in for it, as the document store would keep it.
pub fn edited(source: &str, format: DocumentFormat) -> (DocumentContext, SourcePosition) {
    let (content, position) = with_cursor(source);
    let previous = document(SAMPLE_YAML, DocumentFormat::Yaml);
    let current = document(&content, format).with_fallback(&previous);
    (current, position)
}
