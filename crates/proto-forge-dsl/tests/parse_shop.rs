use proto_forge_core::types::{FieldType, Label, OptionValue, ScalarType, Syntax};
use proto_forge_core::{Location, LocationKind, NodeId, SourceLocationTable};
use proto_forge_dsl::{parse, Diagnostics, FileErrorCollector, MultiFileErrorCollector};

/// A storefront API touching most of the grammar.
const SHOP_SCHEMA: &str = r#"// Storefront API.

syntax = "proto3";

package shop.v1;

import "google/protobuf/timestamp.proto";
import public "shop/v1/money.proto";

option java_package = "com.example.shop.v1";
option go_package = "example.com/shop/v1;shopv1";

// An order placed by a customer.
message Order {
  int64 id = 1;                          // Server-assigned.
  string customer_email = 2 [json_name = "email"];
  repeated LineItem items = 3;
  map<string, string> labels = 4;
  google.protobuf.Timestamp placed_at = 5;
  Status status = 6;

  oneof payment {
    CardPayment card = 10;
    string voucher_code = 11;
  }

  reserved 7, 8, 20 to 29;
  reserved "legacy_total";

  enum Status {
    STATUS_UNSPECIFIED = 0;
    STATUS_PLACED = 1;
    STATUS_SHIPPED = 2 [deprecated = true];
  }
}

message LineItem {
  string sku = 1;
  uint32 quantity = 2;
  Money unit_price = 3;
}

message CardPayment {
  string token = 1;
}

service OrderService {
  option (shop.v1.api_version) = "2024-01";

  rpc GetOrder(GetOrderRequest) returns (Order);
  rpc WatchOrders(stream WatchRequest) returns (stream Order) {
    option deprecated = false;
  }
}
"#;

fn parse_shop() -> (proto_forge_core::types::FileSchema, SourceLocationTable) {
    let mut diagnostics = Diagnostics::new();
    let mut locations = SourceLocationTable::new();
    let file = parse(SHOP_SCHEMA, &mut diagnostics, &mut locations)
        .unwrap_or_else(|e| panic!("shop schema should parse: {e}: {:?}", diagnostics.into_vec()));
    (file, locations)
}

#[test]
fn parse_full_shop_schema() {
    let (file, _) = parse_shop();

    assert_eq!(file.syntax, Some(Syntax::Proto3));
    assert_eq!(file.package.as_deref(), Some("shop.v1"));
    assert_eq!(
        file.dependencies,
        ["google/protobuf/timestamp.proto", "shop/v1/money.proto"]
    );
    assert_eq!(file.public_dependencies, [1]);
    assert_eq!(file.options.len(), 2);
    let go_package = file.find_option(&file.options, "go_package").expect("go_package");
    assert_eq!(
        go_package.value,
        OptionValue::String("example.com/shop/v1;shopv1".into())
    );

    // --- Order ---
    let order = file.find_message("Order").expect("Order");
    let names: Vec<_> = file.message_fields(order).map(|f| f.name.as_str()).collect();
    assert_eq!(
        names,
        ["id", "customer_email", "items", "labels", "placed_at", "status", "card", "voucher_code"]
    );

    let email = file.field(file.find_field(order, "customer_email").unwrap());
    assert_eq!(email.json_name.as_deref(), Some("email"));
    assert_eq!(email.field_type, FieldType::Scalar(ScalarType::String));

    let items = file.field(file.find_field(order, "items").unwrap());
    assert_eq!(items.label, Some(Label::Repeated));
    assert_eq!(items.field_type, FieldType::Named("LineItem".into()));

    let placed_at = file.field(file.find_field(order, "placed_at").unwrap());
    assert_eq!(
        placed_at.field_type,
        FieldType::Named("google.protobuf.Timestamp".into())
    );

    // map field desugars to a nested entry message
    let labels = file.field(file.find_field(order, "labels").unwrap());
    assert_eq!(labels.field_type, FieldType::Named("LabelsEntry".into()));
    assert!(labels.is_repeated());
    let entry = file
        .find_nested_message(order, "LabelsEntry")
        .expect("LabelsEntry");
    assert!(file.find_option(&file.message(entry).options, "map_entry").is_some());

    // oneof membership
    let message = file.message(order);
    assert_eq!(message.oneofs.len(), 1);
    let payment = message.oneofs[0];
    assert_eq!(file.oneof(payment).name, "payment");
    let members: Vec<_> = file
        .message_fields(order)
        .filter(|f| f.oneof == Some(payment))
        .map(|f| f.number)
        .collect();
    assert_eq!(members, [10, 11]);

    // reserved ranges are half-open
    let ranges: Vec<_> = message.reserved_ranges.iter().map(|r| (r.start, r.end)).collect();
    assert_eq!(ranges, [(7, 8), (8, 9), (20, 30)]);
    assert_eq!(message.reserved_names, ["legacy_total"]);
    assert!(message.is_reserved_number(25));

    // nested enum
    assert_eq!(message.nested_enums.len(), 1);
    let status = message.nested_enums[0];
    let values: Vec<_> = file
        .enum_values_of(status)
        .map(|v| (v.name.as_str(), v.number))
        .collect();
    assert_eq!(
        values,
        [("STATUS_UNSPECIFIED", 0), ("STATUS_PLACED", 1), ("STATUS_SHIPPED", 2)]
    );

    // --- OrderService ---
    let service = file.find_service("OrderService").expect("OrderService");
    assert_eq!(file.service(service).options.len(), 1);
    assert_eq!(
        file.option(file.service(service).options[0]).name_string(),
        "(shop.v1.api_version)"
    );
    let methods: Vec<_> = file.service_methods(service).collect();
    assert_eq!(methods.len(), 2);
    assert_eq!(methods[0].input_type, "GetOrderRequest");
    assert!(!methods[0].client_streaming && !methods[0].server_streaming);
    assert!(methods[1].client_streaming && methods[1].server_streaming);
    assert_eq!(methods[1].options.len(), 1);
}

#[test]
fn shop_schema_locations_and_comments() {
    let (file, locations) = parse_shop();
    let order = file.find_message("Order").unwrap();

    assert_eq!(
        locations.find(NodeId::Message(order), LocationKind::Name),
        Some(Location::new(13, 8))
    );
    let id = file.find_field(order, "id").unwrap();
    assert_eq!(
        locations.find(NodeId::Field(id), LocationKind::Number),
        Some(Location::new(14, 13))
    );

    let comments = locations.comments(NodeId::Message(order)).expect("Order comments");
    assert_eq!(comments.leading.as_deref(), Some("An order placed by a customer.\n"));
    let id_comments = locations.comments(NodeId::Field(id)).expect("id comments");
    assert_eq!(id_comments.trailing.as_deref(), Some("Server-assigned.\n"));

    let syntax_comments = locations.comments(NodeId::Syntax).expect("syntax comments");
    assert_eq!(syntax_comments.detached, ["Storefront API.\n"]);
}

#[derive(Default)]
struct PerFile(Vec<String>);

impl MultiFileErrorCollector for PerFile {
    fn record_error(&mut self, filename: &str, line: usize, column: usize, message: &str) {
        self.0.push(format!("{filename}:{line}:{column}: {message}"));
    }
}

#[test]
fn broken_schema_reports_every_statement_with_filename() {
    let source = "syntax = \"proto3\";\nmessage A { int32 = 1; }\nmessage B { string s = 0; }\nmessage C { bool ok = 1; }\n";
    let mut sink = PerFile::default();
    let mut locations = SourceLocationTable::new();
    let failed = parse(
        source,
        FileErrorCollector::new("broken.proto", &mut sink),
        &mut locations,
    )
    .expect_err("schema has errors");

    assert_eq!(failed.error_count, 2);
    assert!(sink.0.iter().all(|e| e.starts_with("broken.proto:")));
    assert!(sink.0[0].starts_with("broken.proto:1:"));
    assert!(sink.0[1].starts_with("broken.proto:2:"));
    // recovery keeps the declarations after the errors
    assert!(failed.partial.find_message("C").is_some());
}
