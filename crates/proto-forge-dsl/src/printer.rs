use proto_forge_core::types::{
    escape_string, EnumId, ExtendId, FieldDef, FieldId, FieldType, FileSchema, MessageId,
    MessageType, OptionId, OptionValue, ScalarType, ServiceId,
};
use proto_forge_printer::{AnnotationCollector, AnnotationTarget, Printer, PrinterOptions, Vars};
use tracing::debug;

// Descriptor field numbers used in annotation paths.
const FILE_MESSAGE_TYPE: i32 = 4;
const FILE_ENUM_TYPE: i32 = 5;
const FILE_SERVICE: i32 = 6;
const FILE_EXTENSION: i32 = 7;
const MESSAGE_FIELD: i32 = 2;
const MESSAGE_NESTED_TYPE: i32 = 3;
const MESSAGE_ENUM_TYPE: i32 = 4;
const MESSAGE_EXTENSION: i32 = 6;
const MESSAGE_ONEOF: i32 = 8;
const ENUM_VALUE: i32 = 2;
const SERVICE_METHOD: i32 = 2;

/// Print a parsed schema file back to IDL text.
///
/// Declarations come out in a fixed order (options, fields, oneofs, nested
/// types, ranges, extend blocks) with 2-space indentation, so printing the
/// result of parsing this output reproduces it exactly. Map fields are
/// printed as `map<K, V>` and their synthesized entry messages are omitted.
pub fn print(file: &FileSchema) -> String {
    print_with_options(file, PrinterOptions::default())
}

/// [`print`] with custom printer settings, e.g. a different indent width.
pub fn print_with_options(file: &FileSchema, options: PrinterOptions) -> String {
    let mut p = Printer::new(options);
    SchemaWriter { file, origin: "" }.write_file(&mut p);
    debug!(bytes = p.bytes_written(), "printed schema");
    p.into_string()
}

/// [`print_with_options`] that also reports, for every declaration name in
/// the output, the byte range it occupies and its descriptor path inside
/// `origin`.
pub fn print_annotated<'a>(
    file: &'a FileSchema,
    origin: &'a str,
    options: PrinterOptions,
    collector: &'a mut dyn AnnotationCollector,
) -> String {
    let mut p = Printer::with_collector(options, collector);
    SchemaWriter { file, origin }.write_file(&mut p);
    debug!(bytes = p.bytes_written(), origin, "printed annotated schema");
    p.into_string()
}

#[derive(Clone, Copy)]
struct SchemaWriter<'a> {
    file: &'a FileSchema,
    origin: &'a str,
}

fn child(path: &[i32], field: i32, index: usize) -> Vec<i32> {
    let mut path = path.to_vec();
    path.extend([field, index as i32]);
    path
}

/// Emits a blank line before every section but the first.
fn section(p: &mut Printer<'_>, started: &mut bool) {
    if std::mem::replace(started, true) {
        p.emit(Vars::new(), "\n");
    }
}

impl<'a> SchemaWriter<'a> {
    fn named(self, name: &str, path: Vec<i32>) -> Vars<'a> {
        Vars::new()
            .set("name", name)
            .annotation("name", AnnotationTarget::new(self.origin, path))
    }

    fn write_file(self, p: &mut Printer<'a>) {
        let file = self.file;
        let mut started = false;

        if let Some(syntax) = file.syntax {
            section(p, &mut started);
            p.emit([("syntax", syntax.as_str())], "syntax = \"$syntax$\";\n");
        }
        if let Some(package) = &file.package {
            section(p, &mut started);
            p.emit([("package", package.as_str())], "package $package$;\n");
        }
        if !file.dependencies.is_empty() {
            section(p, &mut started);
            for (index, dependency) in file.dependencies.iter().enumerate() {
                let modifier = if file.is_public_dependency(index) {
                    "public "
                } else if file.is_weak_dependency(index) {
                    "weak "
                } else {
                    ""
                };
                let vars = Vars::new()
                    .set("modifier", modifier)
                    .set("path", escape_string(dependency));
                p.emit(vars, "import $modifier$\"$path$\";\n");
            }
        }
        if !file.options.is_empty() {
            section(p, &mut started);
            self.write_options(p, &file.options);
        }

        for (i, &id) in file.message_types.iter().enumerate() {
            section(p, &mut started);
            self.write_message(p, id, vec![FILE_MESSAGE_TYPE, i as i32]);
        }
        for (i, &id) in file.enum_types.iter().enumerate() {
            section(p, &mut started);
            self.write_enum(p, id, vec![FILE_ENUM_TYPE, i as i32]);
        }
        for (i, &id) in file.services.iter().enumerate() {
            section(p, &mut started);
            self.write_service(p, id, vec![FILE_SERVICE, i as i32]);
        }
        for &id in &file.extend_blocks {
            section(p, &mut started);
            self.write_extend(p, id, &file.extensions, &[]);
        }
    }

    fn write_options(self, p: &mut Printer<'a>, options: &[OptionId]) {
        for option in self.file.options_of(options) {
            p.emit(
                [("name", option.name_string()), ("value", option.value.to_string())],
                "option $name$ = $value$;\n",
            );
        }
    }

    /// ` [a = 1, b = 2]`, or nothing when there are no options.
    fn option_list(self, options: &[OptionId]) -> String {
        let parts: Vec<_> = self
            .file
            .options_of(options)
            .map(ToString::to_string)
            .collect();
        bracketed(parts)
    }

    fn is_map_entry(self, message: &MessageType) -> bool {
        self.file
            .find_option(&message.options, "map_entry")
            .is_some_and(|o| matches!(&o.value, OptionValue::Identifier(v) if v == "true"))
    }

    /// Key and value types when `field` is a map field of `owner`.
    fn map_types(self, owner: MessageId, field: &FieldDef) -> Option<(&'a FieldType, &'a FieldType)> {
        let file = self.file;
        let FieldType::Named(entry_name) = &field.field_type else {
            return None;
        };
        if !field.is_repeated() {
            return None;
        }
        let entry = file.message(file.find_nested_message(owner, entry_name)?);
        if !self.is_map_entry(entry) {
            return None;
        }
        match entry.fields.as_slice() {
            [key, value] => Some((&file.field(*key).field_type, &file.field(*value).field_type)),
            _ => None,
        }
    }

    fn has_body(self, message: &MessageType) -> bool {
        !(message.options.is_empty()
            && message.fields.is_empty()
            && message.oneofs.is_empty()
            && message.nested_enums.is_empty()
            && message.extension_ranges.is_empty()
            && message.reserved_ranges.is_empty()
            && message.reserved_names.is_empty()
            && message.extend_blocks.is_empty()
            && message
                .nested_messages
                .iter()
                .all(|&id| self.is_map_entry(self.file.message(id))))
    }

    /// message = "message" IDENT "{" body "}"
    fn write_message(self, p: &mut Printer<'a>, id: MessageId, path: Vec<i32>) {
        let message = self.file.message(id);
        let vars = self.named(&message.name, path.clone());
        if !self.has_body(message) {
            p.emit(vars, "message $_start$name$$name$$_end$name$ {}\n");
            return;
        }
        let vars = vars.callback("body", move |p| {
            p.indent();
            self.write_message_body(p, id, &path);
            p.outdent();
            false
        });
        p.emit(
            vars,
            "
            message $_start$name$$name$$_end$name$ {
            $body$
            }
            ",
        );
    }

    fn write_message_body(self, p: &mut Printer<'a>, id: MessageId, path: &[i32]) {
        let file = self.file;
        let message = file.message(id);
        self.write_options(p, &message.options);

        for (i, &field_id) in message.fields.iter().enumerate() {
            let field = file.field(field_id);
            if field.oneof.is_none() {
                let map = self.map_types(id, field);
                self.write_field(p, field_id, child(path, MESSAGE_FIELD, i), map);
            }
        }

        for (k, &oneof_id) in message.oneofs.iter().enumerate() {
            let oneof = file.oneof(oneof_id);
            p.emit(
                self.named(&oneof.name, child(path, MESSAGE_ONEOF, k)),
                "oneof $_start$name$$name$$_end$name$ {\n",
            );
            p.indent();
            self.write_options(p, &oneof.options);
            for (i, &field_id) in message.fields.iter().enumerate() {
                if file.field(field_id).oneof == Some(oneof_id) {
                    self.write_field(p, field_id, child(path, MESSAGE_FIELD, i), None);
                }
            }
            p.outdent();
            p.emit(Vars::new(), "}\n");
        }

        for (i, &nested) in message.nested_messages.iter().enumerate() {
            if !self.is_map_entry(file.message(nested)) {
                self.write_message(p, nested, child(path, MESSAGE_NESTED_TYPE, i));
            }
        }
        for (i, &nested) in message.nested_enums.iter().enumerate() {
            self.write_enum(p, nested, child(path, MESSAGE_ENUM_TYPE, i));
        }

        for range in &message.extension_ranges {
            let vars = Vars::new()
                .set("range", range_text(range.start, range.end - 1))
                .set("options", self.option_list(&range.options));
            p.emit(vars, "extensions $range$$options$;\n");
        }
        let ranges = message.reserved_ranges.iter().map(|r| (r.start, r.last()));
        write_reserved(p, ranges, &message.reserved_names);

        let mut extension_path = path.to_vec();
        extension_path.push(MESSAGE_EXTENSION);
        for &block in &message.extend_blocks {
            self.write_extend(p, block, &message.extensions, &extension_path);
        }
    }

    /// field = label? type IDENT "=" INT options? ";"
    fn write_field(
        self,
        p: &mut Printer<'a>,
        id: FieldId,
        path: Vec<i32>,
        map: Option<(&FieldType, &FieldType)>,
    ) {
        let field = self.file.field(id);
        let (label, field_type) = match map {
            Some((key, value)) => (String::new(), format!("map<{key}, {value}>")),
            None => (
                field.label.map(|l| format!("{l} ")).unwrap_or_default(),
                field.field_type.to_string(),
            ),
        };

        let mut options = Vec::new();
        if let Some(default) = &field.default_value {
            let quoted = matches!(
                field.field_type.as_scalar(),
                Some(ScalarType::String | ScalarType::Bytes)
            );
            options.push(if quoted {
                format!("default = \"{}\"", escape_string(default))
            } else {
                format!("default = {default}")
            });
        }
        if let Some(json_name) = &field.json_name {
            options.push(format!("json_name = \"{}\"", escape_string(json_name)));
        }
        options.extend(self.file.options_of(&field.options).map(ToString::to_string));

        let vars = self
            .named(&field.name, path)
            .set("label", label)
            .set("type", field_type)
            .set("number", field.number.to_string())
            .set("options", bracketed(options));
        p.emit(
            vars,
            "$label$$type$ $_start$name$$name$$_end$name$ = $number$$options$;\n",
        );
    }

    /// Prints the fields of one extend block. Field paths index into
    /// `extensions`, the extension list of the enclosing scope, under
    /// `scope_path` (the file when empty).
    fn write_extend(
        self,
        p: &mut Printer<'a>,
        id: ExtendId,
        extensions: &[FieldId],
        scope_path: &[i32],
    ) {
        let block = self.file.extend_block(id);
        p.emit([("extendee", block.extendee.as_str())], "extend $extendee$ {\n");
        p.indent();
        for &field in &block.fields {
            let index = extensions.iter().position(|&f| f == field).unwrap_or_default();
            let path = if scope_path.is_empty() {
                vec![FILE_EXTENSION, index as i32]
            } else {
                let mut path = scope_path.to_vec();
                path.push(index as i32);
                path
            };
            self.write_field(p, field, path, None);
        }
        p.outdent();
        p.emit(Vars::new(), "}\n");
    }

    /// enum = "enum" IDENT "{" (option | value | reserved)* "}"
    fn write_enum(self, p: &mut Printer<'a>, id: EnumId, path: Vec<i32>) {
        let file = self.file;
        let enum_type = file.enum_type(id);
        p.emit(
            self.named(&enum_type.name, path.clone()),
            "enum $_start$name$$name$$_end$name$ {\n",
        );
        p.indent();
        self.write_options(p, &enum_type.options);
        for (i, &value_id) in enum_type.values.iter().enumerate() {
            let value = file.enum_value(value_id);
            let vars = self
                .named(&value.name, child(&path, ENUM_VALUE, i))
                .set("number", value.number.to_string())
                .set("options", self.option_list(&value.options));
            p.emit(vars, "$_start$name$$name$$_end$name$ = $number$$options$;\n");
        }
        let ranges = enum_type.reserved_ranges.iter().map(|r| (r.start, r.end));
        write_reserved(p, ranges, &enum_type.reserved_names);
        p.outdent();
        p.emit(Vars::new(), "}\n");
    }

    /// service = "service" IDENT "{" (option | rpc)* "}"
    fn write_service(self, p: &mut Printer<'a>, id: ServiceId, path: Vec<i32>) {
        let file = self.file;
        let service = file.service(id);
        p.emit(
            self.named(&service.name, path.clone()),
            "service $_start$name$$name$$_end$name$ {\n",
        );
        p.indent();
        self.write_options(p, &service.options);
        for (i, &method_id) in service.methods.iter().enumerate() {
            let method = file.method(method_id);
            let stream = |streaming: bool| if streaming { "stream " } else { "" };
            let vars = self
                .named(&method.name, child(&path, SERVICE_METHOD, i))
                .set("input", format!("{}{}", stream(method.client_streaming), method.input_type))
                .set("output", format!("{}{}", stream(method.server_streaming), method.output_type));
            let signature = "rpc $_start$name$$name$$_end$name$($input$) returns ($output$)";
            if method.options.is_empty() {
                p.emit(vars, &format!("{signature};\n"));
            } else {
                p.emit(vars, &format!("{signature} {{\n"));
                p.indent();
                self.write_options(p, &method.options);
                p.outdent();
                p.emit(Vars::new(), "}\n");
            }
        }
        p.outdent();
        p.emit(Vars::new(), "}\n");
    }
}

/// Inclusive range as written in `reserved` and `extensions` statements.
fn range_text(start: i32, last: i32) -> String {
    if start == last {
        start.to_string()
    } else {
        format!("{start} to {last}")
    }
}

fn bracketed(parts: Vec<String>) -> String {
    if parts.is_empty() {
        String::new()
    } else {
        format!(" [{}]", parts.join(", "))
    }
}

fn write_reserved(
    p: &mut Printer<'_>,
    ranges: impl ExactSizeIterator<Item = (i32, i32)>,
    names: &[String],
) {
    if ranges.len() > 0 {
        let list: Vec<_> = ranges.map(|(start, last)| range_text(start, last)).collect();
        p.emit([("ranges", list.join(", "))], "reserved $ranges$;\n");
    }
    if !names.is_empty() {
        let list: Vec<_> = names
            .iter()
            .map(|name| format!("\"{}\"", escape_string(name)))
            .collect();
        p.emit([("names", list.join(", "))], "reserved $names$;\n");
    }
}
