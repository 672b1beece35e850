use std::fmt;

use proto_forge_core::types::{
    validate_field_number, EnumId, EnumReservedRange, EnumType, EnumValue, ExtendBlock, ExtendId,
    ExtensionRange, FieldDef, FieldId, FieldType, FileSchema, Label, MessageId, MessageType,
    MethodDef, OneofDef, OneofId, OptionDef, OptionId, OptionNamePart, OptionValue,
    ReservedRange, ScalarType, ServiceId, ServiceType, Syntax, MAX_FIELD_NUMBER,
};
use proto_forge_core::{CommentSet, Location, LocationKind, NodeId, SourceLocationTable};
use tracing::{debug, trace};

use crate::error::{DslError, ErrorCollector};
use crate::lexer::{LexerOptions, Tokenizer};
use crate::token::{Token, TokenKind};

/// Parser settings.
#[derive(Debug, Clone, Copy)]
pub struct ParserOptions {
    pub lexer: LexerOptions,
    /// Warn when a file has no `syntax` statement.
    pub require_syntax: bool,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            lexer: LexerOptions::default(),
            require_syntax: true,
        }
    }
}

/// Returned when any error was reported during a parse. The partial tree
/// holds everything that parsed before and after the errors.
#[derive(Debug, Clone)]
pub struct ParseFailed {
    pub partial: FileSchema,
    pub error_count: usize,
}

impl fmt::Display for ParseFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.error_count {
            1 => write!(f, "parsing failed with 1 error"),
            n => write!(f, "parsing failed with {n} errors"),
        }
    }
}

impl std::error::Error for ParseFailed {}

/// Marker for a production that failed. The error itself has already been
/// sent to the collector.
#[derive(Debug, Clone, Copy)]
struct Reported;

type PResult<T> = Result<T, Reported>;

/// Where a nested declaration gets linked.
#[derive(Debug, Clone, Copy)]
enum Scope {
    File,
    Message(MessageId),
}

/// What a field declaration belongs to.
enum FieldContext {
    Message {
        message: MessageId,
        oneof: Option<OneofId>,
    },
    Extend {
        block: ExtendId,
        scope: Scope,
        extendee: String,
        extendee_at: Location,
    },
}

/// The type written in a field declaration.
enum ParsedType {
    Plain(FieldType),
    Map(FieldType, FieldType),
}

/// Comments carried by the first token of a declaration.
struct PendingComments {
    leading: Option<String>,
    detached: Vec<String>,
}

/// Recursive descent parser for the schema grammar.
///
/// Pulls tokens from a [`Tokenizer`] and builds a [`FileSchema`] while
/// recording source positions and comments into a
/// [`SourceLocationTable`]. Errors are reported through the tokenizer's
/// collector; after an error the parser skips to the end of the statement
/// and keeps going.
pub struct Parser<'p, 'src, C: ErrorCollector> {
    input: &'p mut Tokenizer<'src, C>,
    locations: &'p mut SourceLocationTable,
    file: FileSchema,
    syntax: Syntax,
    options: ParserOptions,
}

impl<'p, 'src, C: ErrorCollector> Parser<'p, 'src, C> {
    pub fn new(
        input: &'p mut Tokenizer<'src, C>,
        locations: &'p mut SourceLocationTable,
        options: ParserOptions,
    ) -> Self {
        Self {
            input,
            locations,
            file: FileSchema::new(),
            syntax: Syntax::default(),
            options,
        }
    }

    // -- Cursor helpers --

    fn current(&self) -> &Token {
        self.input.current()
    }

    fn here(&self) -> Location {
        self.current().location()
    }

    fn at(&self, text: &str) -> bool {
        self.current().is(text)
    }

    fn at_kind(&self, kind: TokenKind) -> bool {
        self.current().kind == kind
    }

    fn at_end(&self) -> bool {
        self.at_kind(TokenKind::End)
    }

    fn bump(&mut self) {
        self.input.advance();
    }

    fn try_consume(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn error_at(&mut self, at: Location, error: DslError) -> Reported {
        self.input
            .report_error(at.line, at.column, &error.to_string());
        Reported
    }

    fn error_here(&mut self, error: DslError) -> Reported {
        let at = self.here();
        self.error_at(at, error)
    }

    fn unexpected(&mut self, expected: &str) -> Reported {
        let found = self.current().describe();
        self.error_here(DslError::UnexpectedToken {
            expected: expected.to_string(),
            found,
        })
    }

    fn consume(&mut self, text: &str) -> PResult<()> {
        if self.try_consume(text) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("\"{text}\"")))
        }
    }

    fn consume_identifier(&mut self, what: &str) -> PResult<Token> {
        if self.at_kind(TokenKind::Identifier) {
            let token = self.current().clone();
            self.bump();
            Ok(token)
        } else {
            Err(self.unexpected(what))
        }
    }

    fn consume_integer(&mut self, what: &str) -> PResult<u64> {
        if !self.at_kind(TokenKind::Integer) {
            return Err(self.unexpected(what));
        }
        let text = self.current().text.clone();
        let value = parse_integer(&text).map_err(|e| self.error_here(e))?;
        self.bump();
        Ok(value)
    }

    /// An optionally negated integer that must fit an `i32`.
    fn consume_signed_int32(&mut self, what: &str) -> PResult<i32> {
        let negative = self.try_consume("-");
        let at = self.here();
        let text = self.current().text.clone();
        let value = self.consume_integer(what)?;
        let limit = if negative {
            1u64 << 31
        } else {
            i32::MAX as u64
        };
        if value > limit {
            let text = if negative { format!("-{text}") } else { text };
            return Err(self.error_at(at, DslError::IntegerOutOfRange { text }));
        }
        let value = if negative {
            -(value as i64)
        } else {
            value as i64
        };
        Ok(value as i32)
    }

    /// One or more adjacent string literals, concatenated.
    fn consume_string(&mut self, what: &str) -> PResult<String> {
        if !self.at_kind(TokenKind::String) {
            return Err(self.unexpected(what));
        }
        let mut out = String::new();
        while self.at_kind(TokenKind::String) {
            out.push_str(self.current().value.as_deref().unwrap_or_default());
            self.bump();
        }
        Ok(out)
    }

    // -- Locations and comments --

    fn record(&mut self, node: NodeId, kind: LocationKind, at: Location) {
        self.locations.add(node, kind, at);
    }

    fn take_comments(&self) -> PendingComments {
        let token = self.current();
        PendingComments {
            leading: token.leading_comment.clone(),
            detached: token.detached_comments.clone(),
        }
    }

    /// Consumes the `;` or `{` that ends a declaration header and stores
    /// the declaration's comments. The trailing comment is the one after
    /// that token.
    fn consume_end_of_declaration(
        &mut self,
        text: &str,
        node: NodeId,
        pending: PendingComments,
    ) -> PResult<()> {
        self.consume(text)?;
        let trailing = self.input.previous().trailing_comment.clone();
        self.locations.add_comments(
            node,
            CommentSet {
                leading: pending.leading,
                trailing,
                detached: pending.detached,
            },
        );
        Ok(())
    }

    // -- Recovery --

    /// Skips past the next `;` or balanced `{ ... }` block, stopping early
    /// at a `}` that closes the enclosing block.
    fn skip_statement(&mut self) {
        debug!(at = %self.here(), "skipping statement after error");
        loop {
            if self.at_end() || self.at("}") {
                return;
            }
            if self.try_consume(";") {
                return;
            }
            if self.try_consume("{") {
                self.skip_rest_of_block();
                return;
            }
            self.bump();
        }
    }

    fn skip_rest_of_block(&mut self) {
        loop {
            if self.at_end() || self.try_consume("}") {
                return;
            }
            if self.try_consume("{") {
                self.skip_rest_of_block();
                continue;
            }
            self.bump();
        }
    }

    /// Runs `statement` until the closing `}` of a block.
    fn parse_block_body(
        &mut self,
        context: &'static str,
        mut statement: impl FnMut(&mut Self) -> PResult<()>,
    ) -> PResult<()> {
        while !self.try_consume("}") {
            if self.at_end() {
                return Err(self.error_here(DslError::UnexpectedEndOfInput { context }));
            }
            if statement(self).is_err() {
                self.skip_statement();
            }
        }
        Ok(())
    }

    // -- Grammar productions --

    /// file = syntax? top_level_statement*
    ///
    /// Returns the tree if no error was reported, lexer errors included.
    pub fn parse_file(mut self) -> Result<FileSchema, ParseFailed> {
        debug!("parsing schema");
        if self.at_kind(TokenKind::Start) {
            self.bump();
        }
        let start = self.here();
        self.record(NodeId::File, LocationKind::Other, start);

        if self.at("syntax") {
            if self.parse_syntax().is_err() {
                self.skip_statement();
            }
        } else if self.options.require_syntax {
            self.input
                .report_warning(start.line, start.column, &DslError::MissingSyntax.to_string());
        }

        while !self.at_end() {
            if self.at("}") {
                self.error_here(DslError::UnmatchedCloseBrace);
                self.bump();
                continue;
            }
            if self.parse_top_level_statement().is_err() {
                self.skip_statement();
            }
        }

        let error_count = self.input.error_count();
        debug!(
            messages = self.file.message_types.len(),
            enums = self.file.enum_types.len(),
            services = self.file.services.len(),
            error_count,
            "parsed schema"
        );
        if error_count > 0 {
            Err(ParseFailed {
                partial: self.file,
                error_count,
            })
        } else {
            Ok(self.file)
        }
    }

    /// syntax = "syntax" "=" STRING ";"
    fn parse_syntax(&mut self) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("syntax")?;
        self.consume("=")?;
        let value_at = self.here();
        let value = self.consume_string("syntax identifier")?;
        let syntax = Syntax::parse(&value).map_err(|e| self.error_at(value_at, e.into()))?;
        self.file.syntax = Some(syntax);
        self.syntax = syntax;
        self.record(NodeId::Syntax, LocationKind::Other, start);
        self.record(NodeId::Syntax, LocationKind::Name, value_at);
        self.consume_end_of_declaration(";", NodeId::Syntax, pending)
    }

    fn parse_top_level_statement(&mut self) -> PResult<()> {
        trace!(at = %self.here(), token = %self.current().text, "top-level statement");
        if self.try_consume(";") {
            Ok(())
        } else if self.at("message") {
            self.parse_message_definition(Scope::File)
        } else if self.at("enum") {
            self.parse_enum_definition(Scope::File)
        } else if self.at("service") {
            self.parse_service()
        } else if self.at("extend") {
            self.parse_extend(Scope::File)
        } else if self.at("import") {
            self.parse_import()
        } else if self.at("package") {
            self.parse_package()
        } else if self.at("option") {
            let id = self.parse_option_statement()?;
            self.file.options.push(id);
            Ok(())
        } else {
            Err(self.error_here(DslError::ExpectedTopLevelStatement))
        }
    }

    /// import = "import" ("public" | "weak")? STRING ";"
    fn parse_import(&mut self) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("import")?;
        let public = self.try_consume("public");
        let weak = !public && self.try_consume("weak");
        let path_at = self.here();
        let path = self.consume_string("a file name")?;

        let index = self.file.add_dependency(path);
        if public {
            self.file.public_dependencies.push(index);
        }
        if weak {
            self.file.weak_dependencies.push(index);
        }
        let node = NodeId::Dependency(index);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Import, path_at);
        self.consume_end_of_declaration(";", node, pending)
    }

    /// package = "package" IDENT ("." IDENT)* ";"
    fn parse_package(&mut self) -> PResult<()> {
        if self.file.package.is_some() {
            return Err(self.error_here(DslError::MultiplePackages));
        }
        let pending = self.take_comments();
        let start = self.here();
        self.consume("package")?;
        let name_at = self.here();
        let mut name = self.consume_identifier("package name")?.text;
        while self.try_consume(".") {
            name.push('.');
            name.push_str(&self.consume_identifier("identifier")?.text);
        }
        self.file.package = Some(name);
        self.record(NodeId::Package, LocationKind::Other, start);
        self.record(NodeId::Package, LocationKind::Name, name_at);
        self.consume_end_of_declaration(";", NodeId::Package, pending)
    }

    /// message = "message" IDENT "{" message_statement* "}"
    fn parse_message_definition(&mut self, scope: Scope) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("message")?;
        let name = self.consume_identifier("message name")?;

        let id = self.file.add_message(MessageType::new(name.text.clone()));
        match scope {
            Scope::File => self.file.message_types.push(id),
            Scope::Message(parent) => self.file.message_mut(parent).nested_messages.push(id),
        }
        let node = NodeId::Message(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Name, name.location());

        self.consume_end_of_declaration("{", node, pending)?;
        self.parse_block_body("message definition", |p| p.parse_message_statement(id))
    }

    fn parse_message_statement(&mut self, message: MessageId) -> PResult<()> {
        if self.try_consume(";") {
            Ok(())
        } else if self.at("message") {
            self.parse_message_definition(Scope::Message(message))
        } else if self.at("enum") {
            self.parse_enum_definition(Scope::Message(message))
        } else if self.at("extensions") {
            self.parse_extensions(message)
        } else if self.at("reserved") {
            self.parse_reserved(message)
        } else if self.at("extend") {
            self.parse_extend(Scope::Message(message))
        } else if self.at("option") {
            let id = self.parse_option_statement()?;
            self.file.message_mut(message).options.push(id);
            Ok(())
        } else if self.at("oneof") {
            self.parse_oneof(message)
        } else {
            self.parse_field(&FieldContext::Message {
                message,
                oneof: None,
            })
        }
    }

    /// field = label? field_type IDENT "=" INT field_options? ";"
    fn parse_field(&mut self, context: &FieldContext) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        let in_oneof = matches!(context, FieldContext::Message { oneof: Some(_), .. });

        let label = if self.at_kind(TokenKind::Identifier) {
            Label::from_keyword(&self.current().text)
        } else {
            None
        };
        if label.is_some() {
            self.bump();
        }
        if in_oneof && label.is_some() {
            return Err(self.error_at(start, DslError::LabelInOneof));
        }
        if label == Some(Label::Required) && self.syntax == Syntax::Proto3 {
            return Err(self.error_at(start, DslError::RequiredInProto3));
        }
        if self.at("group") {
            return Err(self.error_here(DslError::GroupsUnsupported));
        }

        let type_at = self.here();
        let parsed = self.parse_field_type()?;
        if let ParsedType::Map(..) = parsed {
            if label.is_some() {
                return Err(self.error_at(start, DslError::LabelOnMapField));
            }
            if in_oneof {
                return Err(self.error_at(
                    type_at,
                    DslError::MapFieldNotAllowed { context: "in oneofs" },
                ));
            }
            if matches!(context, FieldContext::Extend { .. }) {
                return Err(self.error_at(
                    type_at,
                    DslError::MapFieldNotAllowed {
                        context: "to be extensions",
                    },
                ));
            }
        } else if label.is_none() && self.syntax == Syntax::Proto2 && !in_oneof {
            return Err(self.error_at(type_at, DslError::MissingLabel));
        }

        let name = self.consume_identifier("field name")?;
        self.consume("=")?;
        let number_at = self.here();
        let number = self.consume_field_number()?;
        if let FieldContext::Message { message, .. } = context {
            self.check_field_number_unused(*message, number, number_at);
        }

        let (field_type, label, map_types) = match parsed {
            ParsedType::Plain(field_type) => (field_type, label, None),
            ParsedType::Map(key, value) => (
                FieldType::Named(map_entry_name(&name.text)),
                Some(Label::Repeated),
                Some((key, value)),
            ),
        };
        let mut field = FieldDef::new(name.text.clone(), number, field_type);
        field.label = label;
        match context {
            FieldContext::Message { oneof, .. } => field.oneof = *oneof,
            FieldContext::Extend { extendee, .. } => field.extendee = Some(extendee.clone()),
        }
        let id = self.file.add_field(field);

        let node = NodeId::Field(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Type, type_at);
        self.record(node, LocationKind::Name, name.location());
        self.record(node, LocationKind::Number, number_at);

        match context {
            FieldContext::Message { message, .. } => {
                self.file.message_mut(*message).fields.push(id);
                if let Some((key, value)) = map_types {
                    self.add_map_entry(*message, &name.text, key, value);
                }
            }
            FieldContext::Extend {
                block,
                scope,
                extendee_at,
                ..
            } => {
                self.file.extend_block_mut(*block).fields.push(id);
                match scope {
                    Scope::File => self.file.extensions.push(id),
                    Scope::Message(m) => self.file.message_mut(*m).extensions.push(id),
                }
                self.record(node, LocationKind::Extendee, *extendee_at);
            }
        }

        if self.at("[") {
            self.parse_field_options(id)?;
        }
        self.consume_end_of_declaration(";", node, pending)
    }

    /// Reports a number collision with an earlier field of `message`,
    /// oneof members included. Parsing of the statement continues.
    fn check_field_number_unused(&mut self, message: MessageId, number: i32, at: Location) {
        let Some(previous) = self
            .file
            .message_fields(message)
            .find(|f| f.number == number)
            .map(|f| f.name.clone())
        else {
            return;
        };
        let message = self.file.message(message).name.clone();
        self.error_at(
            at,
            DslError::DuplicateFieldNumber {
                number,
                message,
                previous,
            },
        );
    }

    /// Synthesizes the nested `XxxEntry` message a map field stands for.
    fn add_map_entry(&mut self, owner: MessageId, field_name: &str, key: FieldType, value: FieldType) {
        let key = self
            .file
            .add_field(FieldDef::new("key", 1, key).with_label(Label::Optional));
        let value = self
            .file
            .add_field(FieldDef::new("value", 2, value).with_label(Label::Optional));
        let map_entry = self.file.add_option(OptionDef::new(
            vec![OptionNamePart::simple("map_entry")],
            OptionValue::Identifier("true".into()),
        ));

        let mut entry = MessageType::new(map_entry_name(field_name));
        entry.fields = vec![key, value];
        entry.options.push(map_entry);
        let entry = self.file.add_message(entry);
        self.file.message_mut(owner).nested_messages.push(entry);
    }

    /// field_type = "map" "<" scalar "," type ">" | type
    fn parse_field_type(&mut self) -> PResult<ParsedType> {
        if !self.at("map") {
            return Ok(ParsedType::Plain(self.parse_type()?));
        }
        self.bump();
        if !self.try_consume("<") {
            return Ok(ParsedType::Plain(FieldType::Named("map".into())));
        }
        let key_at = self.here();
        let key = self.parse_type()?;
        if !key.as_scalar().is_some_and(ScalarType::is_valid_map_key) {
            let found = match &key {
                FieldType::Scalar(s) => s.keyword().to_string(),
                FieldType::Named(name) => name.clone(),
            };
            return Err(self.error_at(key_at, DslError::InvalidMapKeyType { found }));
        }
        self.consume(",")?;
        let value = self.parse_type()?;
        self.consume(">")?;
        Ok(ParsedType::Map(key, value))
    }

    /// type = scalar_keyword | type_name
    fn parse_type(&mut self) -> PResult<FieldType> {
        if self.at_kind(TokenKind::Identifier) {
            if let Some(scalar) = ScalarType::from_keyword(&self.current().text) {
                self.bump();
                return Ok(FieldType::Scalar(scalar));
            }
        }
        Ok(FieldType::Named(self.parse_type_name()?))
    }

    /// type_name = "."? IDENT ("." IDENT)*
    fn parse_type_name(&mut self) -> PResult<String> {
        let mut name = String::new();
        if self.try_consume(".") {
            name.push('.');
        }
        name.push_str(&self.consume_identifier("type name")?.text);
        while self.try_consume(".") {
            name.push('.');
            name.push_str(&self.consume_identifier("identifier")?.text);
        }
        Ok(name)
    }

    fn consume_field_number(&mut self) -> PResult<i32> {
        let at = self.here();
        let value = self.consume_integer("field number")?;
        let value = i64::try_from(value).unwrap_or(i64::MAX);
        validate_field_number(value).map_err(|e| self.error_at(at, e.into()))
    }

    /// field_options = "[" field_option ("," field_option)* "]"
    fn parse_field_options(&mut self, field: FieldId) -> PResult<()> {
        self.consume("[")?;
        loop {
            if self.at("default") {
                self.parse_default_value(field)?;
            } else if self.at("json_name") {
                self.parse_json_name(field)?;
            } else {
                let start = self.here();
                let option = self.parse_option_body(start)?;
                self.file.field_mut(field).options.push(option);
            }
            if !self.try_consume(",") {
                break;
            }
        }
        self.consume("]")
    }

    /// default = "default" "=" literal, checked against the field type.
    fn parse_default_value(&mut self, field: FieldId) -> PResult<()> {
        let start = self.here();
        self.consume("default")?;
        self.consume("=")?;
        if self.syntax == Syntax::Proto3 {
            return Err(self.error_at(start, DslError::DefaultInProto3));
        }
        let def = self.file.field(field);
        if def.default_value.is_some() {
            return Err(self.error_at(start, DslError::DuplicateOption { name: "default" }));
        }
        if def.is_repeated() {
            return Err(self.error_at(start, DslError::RepeatedDefault));
        }
        let scalar = def.field_type.as_scalar();

        self.record(NodeId::Field(field), LocationKind::DefaultValue, self.here());
        let value = match scalar {
            Some(ScalarType::Double | ScalarType::Float) => {
                let mut text = String::new();
                if self.try_consume("-") {
                    text.push('-');
                }
                let token = self.current().clone();
                match token.kind {
                    TokenKind::Integer => {
                        text.push_str(&self.consume_integer("number")?.to_string());
                    }
                    TokenKind::Float => {
                        self.bump();
                        text.push_str(&token.text);
                    }
                    TokenKind::Identifier if token.text == "inf" || token.text == "nan" => {
                        self.bump();
                        text.push_str(&token.text);
                    }
                    _ => return Err(self.unexpected("number")),
                }
                text
            }
            Some(
                scalar @ (ScalarType::Int32
                | ScalarType::Int64
                | ScalarType::Uint32
                | ScalarType::Uint64
                | ScalarType::Sint32
                | ScalarType::Sint64
                | ScalarType::Fixed32
                | ScalarType::Fixed64
                | ScalarType::Sfixed32
                | ScalarType::Sfixed64),
            ) => {
                let negative = self.try_consume("-");
                if negative && scalar.is_unsigned() {
                    return Err(self.error_here(DslError::NegativeUnsignedDefault));
                }
                let at = self.here();
                let text = self.current().text.clone();
                let value = self.consume_integer("integer")?;
                if value > integer_limit(scalar, negative) {
                    let text = if negative { format!("-{text}") } else { text };
                    return Err(self.error_at(at, DslError::IntegerOutOfRange { text }));
                }
                if negative {
                    format!("-{value}")
                } else {
                    value.to_string()
                }
            }
            Some(ScalarType::Bool) => {
                if !(self.at("true") || self.at("false")) {
                    return Err(self.unexpected("\"true\" or \"false\""));
                }
                let text = self.current().text.clone();
                self.bump();
                text
            }
            Some(ScalarType::String | ScalarType::Bytes) => self.consume_string("string")?,
            None => {
                // Enum or message: the linker decides whether this is valid.
                let mut text = String::new();
                if self.try_consume("-") {
                    text.push('-');
                }
                let token = self.current().clone();
                match token.kind {
                    TokenKind::Identifier | TokenKind::Integer | TokenKind::Float => {
                        self.bump();
                        text.push_str(&token.text);
                    }
                    _ => return Err(self.unexpected("default value")),
                }
                text
            }
        };
        self.file.field_mut(field).default_value = Some(value);
        Ok(())
    }

    /// json_name = "json_name" "=" STRING
    fn parse_json_name(&mut self, field: FieldId) -> PResult<()> {
        let start = self.here();
        self.consume("json_name")?;
        self.consume("=")?;
        if self.file.field(field).json_name.is_some() {
            return Err(self.error_at(start, DslError::DuplicateOption { name: "json_name" }));
        }
        let value_at = self.here();
        let value = self.consume_string("json name")?;
        self.file.field_mut(field).json_name = Some(value);
        let node = NodeId::Field(field);
        self.record(node, LocationKind::OptionName, start);
        self.record(node, LocationKind::OptionValue, value_at);
        Ok(())
    }

    /// oneof = "oneof" IDENT "{" (option_statement | field)* "}"
    fn parse_oneof(&mut self, message: MessageId) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("oneof")?;
        let name = self.consume_identifier("oneof name")?;

        let id = self.file.add_oneof(OneofDef::new(name.text.clone()));
        self.file.message_mut(message).oneofs.push(id);
        let node = NodeId::Oneof(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Name, name.location());

        self.consume_end_of_declaration("{", node, pending)?;
        let context = FieldContext::Message {
            message,
            oneof: Some(id),
        };
        self.parse_block_body("oneof definition", |p| {
            if p.try_consume(";") {
                Ok(())
            } else if p.at("option") {
                let option = p.parse_option_statement()?;
                p.file.oneof_mut(id).options.push(option);
                Ok(())
            } else {
                p.parse_field(&context)
            }
        })
    }

    /// range = INT ("to" (INT | "max"))?
    ///
    /// Converted to the half-open form; `max` stands for the largest field
    /// number.
    fn parse_field_range(&mut self) -> PResult<ReservedRange> {
        let start_at = self.here();
        let start = self.consume_range_bound()?;
        let last = if self.try_consume("to") {
            if self.try_consume("max") {
                MAX_FIELD_NUMBER
            } else {
                self.consume_range_bound()?
            }
        } else {
            start
        };
        ReservedRange::from_inclusive(start, last).map_err(|e| self.error_at(start_at, e.into()))
    }

    fn consume_range_bound(&mut self) -> PResult<i32> {
        let at = self.here();
        let text = self.current().text.clone();
        let value = self.consume_integer("field number range")?;
        i32::try_from(value).map_err(|_| self.error_at(at, DslError::IntegerOutOfRange { text }))
    }

    /// extensions = "extensions" range ("," range)* option_list? ";"
    fn parse_extensions(&mut self, message: MessageId) -> PResult<()> {
        let pending = self.take_comments();
        self.consume("extensions")?;
        let first = self.file.message(message).extension_ranges.len();
        loop {
            let at = self.here();
            let range = self.parse_field_range()?;
            let ranges = &mut self.file.message_mut(message).extension_ranges;
            ranges.push(ExtensionRange::new(range));
            let index = ranges.len() - 1;
            self.record(NodeId::ExtensionRange(message, index), LocationKind::Other, at);
            if !self.try_consume(",") {
                break;
            }
        }
        if self.at("[") {
            let options = self.parse_option_list()?;
            for range in &mut self.file.message_mut(message).extension_ranges[first..] {
                range.options = options.clone();
            }
        }
        self.consume_end_of_declaration(";", NodeId::ExtensionRange(message, first), pending)
    }

    /// reserved = "reserved" (range ("," range)* | STRING ("," STRING)*) ";"
    fn parse_reserved(&mut self, message: MessageId) -> PResult<()> {
        let pending = self.take_comments();
        self.consume("reserved")?;
        let node = if self.at_kind(TokenKind::String) {
            let first = self.file.message(message).reserved_names.len();
            loop {
                let at = self.here();
                let name = self.consume_string("reserved name")?;
                let names = &mut self.file.message_mut(message).reserved_names;
                names.push(name);
                let index = names.len() - 1;
                self.record(NodeId::MessageReservedName(message, index), LocationKind::Other, at);
                if !self.try_consume(",") {
                    break;
                }
            }
            NodeId::MessageReservedName(message, first)
        } else {
            let first = self.file.message(message).reserved_ranges.len();
            loop {
                let at = self.here();
                let range = self.parse_field_range()?;
                let ranges = &mut self.file.message_mut(message).reserved_ranges;
                ranges.push(range);
                let index = ranges.len() - 1;
                self.record(NodeId::MessageReservedRange(message, index), LocationKind::Other, at);
                if !self.try_consume(",") {
                    break;
                }
            }
            NodeId::MessageReservedRange(message, first)
        };
        self.consume_end_of_declaration(";", node, pending)
    }

    /// enum = "enum" IDENT "{" enum_statement* "}"
    fn parse_enum_definition(&mut self, scope: Scope) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("enum")?;
        let name = self.consume_identifier("enum name")?;

        let id = self.file.add_enum(EnumType::new(name.text.clone()));
        match scope {
            Scope::File => self.file.enum_types.push(id),
            Scope::Message(parent) => self.file.message_mut(parent).nested_enums.push(id),
        }
        let node = NodeId::Enum(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Name, name.location());

        self.consume_end_of_declaration("{", node, pending)?;
        self.parse_block_body("enum definition", |p| p.parse_enum_statement(id))
    }

    fn parse_enum_statement(&mut self, enum_id: EnumId) -> PResult<()> {
        if self.try_consume(";") {
            Ok(())
        } else if self.at("option") {
            let option = self.parse_option_statement()?;
            self.file.enum_type_mut(enum_id).options.push(option);
            Ok(())
        } else if self.at("reserved") {
            self.parse_enum_reserved(enum_id)
        } else {
            self.parse_enum_value(enum_id)
        }
    }

    /// enum_value = IDENT "=" "-"? INT option_list? ";"
    fn parse_enum_value(&mut self, enum_id: EnumId) -> PResult<()> {
        let pending = self.take_comments();
        let name = self.consume_identifier("enum constant name")?;
        self.consume("=")?;
        let number_at = self.here();
        let number = self.consume_signed_int32("enum constant number")?;

        let id = self
            .file
            .add_enum_value(EnumValue::new(name.text.clone(), number));
        self.file.enum_type_mut(enum_id).values.push(id);
        let node = NodeId::EnumValue(id);
        self.record(node, LocationKind::Other, name.location());
        self.record(node, LocationKind::Name, name.location());
        self.record(node, LocationKind::Number, number_at);

        if self.at("[") {
            let options = self.parse_option_list()?;
            self.file.enum_value_mut(id).options = options;
        }
        self.consume_end_of_declaration(";", node, pending)
    }

    /// enum_reserved = "reserved" (enum_range ("," enum_range)* | STRING ("," STRING)*) ";"
    ///
    /// Enum ranges stay inclusive; `max` is the largest `i32`.
    fn parse_enum_reserved(&mut self, enum_id: EnumId) -> PResult<()> {
        let pending = self.take_comments();
        self.consume("reserved")?;
        let node = if self.at_kind(TokenKind::String) {
            let first = self.file.enum_type(enum_id).reserved_names.len();
            loop {
                let at = self.here();
                let name = self.consume_string("reserved name")?;
                let names = &mut self.file.enum_type_mut(enum_id).reserved_names;
                names.push(name);
                let index = names.len() - 1;
                self.record(NodeId::EnumReservedName(enum_id, index), LocationKind::Other, at);
                if !self.try_consume(",") {
                    break;
                }
            }
            NodeId::EnumReservedName(enum_id, first)
        } else {
            let first = self.file.enum_type(enum_id).reserved_ranges.len();
            loop {
                let at = self.here();
                let start = self.consume_signed_int32("enum number range")?;
                let end = if self.try_consume("to") {
                    if self.try_consume("max") {
                        i32::MAX
                    } else {
                        self.consume_signed_int32("enum number range")?
                    }
                } else {
                    start
                };
                let range =
                    EnumReservedRange::new(start, end).map_err(|e| self.error_at(at, e.into()))?;
                let ranges = &mut self.file.enum_type_mut(enum_id).reserved_ranges;
                ranges.push(range);
                let index = ranges.len() - 1;
                self.record(NodeId::EnumReservedRange(enum_id, index), LocationKind::Other, at);
                if !self.try_consume(",") {
                    break;
                }
            }
            NodeId::EnumReservedRange(enum_id, first)
        };
        self.consume_end_of_declaration(";", node, pending)
    }

    /// service = "service" IDENT "{" (option_statement | method | ";")* "}"
    fn parse_service(&mut self) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("service")?;
        let name = self.consume_identifier("service name")?;

        let id = self.file.add_service(ServiceType::new(name.text.clone()));
        self.file.services.push(id);
        let node = NodeId::Service(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Name, name.location());

        self.consume_end_of_declaration("{", node, pending)?;
        self.parse_block_body("service definition", |p| p.parse_service_statement(id))
    }

    fn parse_service_statement(&mut self, service: ServiceId) -> PResult<()> {
        if self.try_consume(";") {
            Ok(())
        } else if self.at("option") {
            let option = self.parse_option_statement()?;
            self.file.service_mut(service).options.push(option);
            Ok(())
        } else {
            self.parse_method(service)
        }
    }

    /// method = "rpc" IDENT "(" "stream"? type_name ")"
    ///          "returns" "(" "stream"? type_name ")" (";" | "{" option_statement* "}")
    fn parse_method(&mut self, service: ServiceId) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("rpc")?;
        let name = self.consume_identifier("method name")?;

        let id = self
            .file
            .add_method(MethodDef::new(name.text.clone(), "", ""));
        self.file.service_mut(service).methods.push(id);
        let node = NodeId::Method(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Name, name.location());

        self.consume("(")?;
        let client_streaming = self.try_consume("stream");
        let input_at = self.here();
        let input_type = self.parse_method_type()?;
        self.record(node, LocationKind::InputType, input_at);
        let method = self.file.method_mut(id);
        method.input_type = input_type;
        method.client_streaming = client_streaming;
        self.consume(")")?;

        self.consume("returns")?;
        self.consume("(")?;
        let server_streaming = self.try_consume("stream");
        let output_at = self.here();
        let output_type = self.parse_method_type()?;
        self.record(node, LocationKind::OutputType, output_at);
        let method = self.file.method_mut(id);
        method.output_type = output_type;
        method.server_streaming = server_streaming;
        self.consume(")")?;

        if !self.at("{") {
            return self.consume_end_of_declaration(";", node, pending);
        }
        self.consume_end_of_declaration("{", node, pending)?;
        self.parse_block_body("method options", |p| {
            if p.try_consume(";") {
                Ok(())
            } else if p.at("option") {
                let option = p.parse_option_statement()?;
                p.file.method_mut(id).options.push(option);
                Ok(())
            } else {
                Err(p.unexpected("\"option\""))
            }
        })
    }

    fn parse_method_type(&mut self) -> PResult<String> {
        if self.at_kind(TokenKind::Identifier)
            && ScalarType::from_keyword(&self.current().text).is_some()
        {
            let found = self.current().text.clone();
            return Err(self.error_here(DslError::ScalarNotAllowed { found }));
        }
        self.parse_type_name()
    }

    /// extend = "extend" type_name "{" (field | ";")* "}"
    fn parse_extend(&mut self, scope: Scope) -> PResult<()> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("extend")?;
        let extendee_at = self.here();
        let extendee = self.parse_type_name()?;

        let id = self
            .file
            .add_extend_block(ExtendBlock::new(extendee.clone()));
        match scope {
            Scope::File => self.file.extend_blocks.push(id),
            Scope::Message(m) => self.file.message_mut(m).extend_blocks.push(id),
        }
        let node = NodeId::Extend(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::Extendee, extendee_at);

        self.consume_end_of_declaration("{", node, pending)?;
        let context = FieldContext::Extend {
            block: id,
            scope,
            extendee,
            extendee_at,
        };
        self.parse_block_body("extend block", |p| {
            if p.try_consume(";") {
                Ok(())
            } else {
                p.parse_field(&context)
            }
        })
    }

    /// option_statement = "option" option_body ";"
    fn parse_option_statement(&mut self) -> PResult<OptionId> {
        let pending = self.take_comments();
        let start = self.here();
        self.consume("option")?;
        let id = self.parse_option_body(start)?;
        self.consume_end_of_declaration(";", NodeId::Option(id), pending)?;
        Ok(id)
    }

    /// option_list = "[" option_body ("," option_body)* "]"
    fn parse_option_list(&mut self) -> PResult<Vec<OptionId>> {
        self.consume("[")?;
        let mut options = Vec::new();
        loop {
            let start = self.here();
            options.push(self.parse_option_body(start)?);
            if !self.try_consume(",") {
                break;
            }
        }
        self.consume("]")?;
        Ok(options)
    }

    /// option_body = option_name_part ("." option_name_part)* "=" option_value
    /// option_name_part = IDENT | "(" "."? IDENT ("." IDENT)* ")"
    fn parse_option_body(&mut self, start: Location) -> PResult<OptionId> {
        let name_at = self.here();
        let mut name = Vec::new();
        loop {
            if self.try_consume("(") {
                let mut extension = String::new();
                if self.try_consume(".") {
                    extension.push('.');
                }
                extension.push_str(&self.consume_identifier("option name")?.text);
                while self.try_consume(".") {
                    extension.push('.');
                    extension.push_str(&self.consume_identifier("identifier")?.text);
                }
                self.consume(")")?;
                name.push(OptionNamePart::extension(extension));
            } else {
                let part = self.consume_identifier("option name")?;
                name.push(OptionNamePart::simple(part.text));
            }
            if !self.try_consume(".") {
                break;
            }
        }
        self.consume("=")?;
        let value_at = self.here();
        let value = self.parse_option_value()?;

        let id = self.file.add_option(OptionDef::new(name, value));
        let node = NodeId::Option(id);
        self.record(node, LocationKind::Other, start);
        self.record(node, LocationKind::OptionName, name_at);
        self.record(node, LocationKind::OptionValue, value_at);
        Ok(id)
    }

    /// option_value = "-"? (IDENT | INT | FLOAT) | STRING+ | aggregate
    fn parse_option_value(&mut self) -> PResult<OptionValue> {
        let negative = self.try_consume("-");
        let token = self.current().clone();
        match token.kind {
            TokenKind::Identifier => {
                self.bump();
                if !negative {
                    return Ok(OptionValue::Identifier(token.text));
                }
                match token.text.as_str() {
                    "inf" => Ok(OptionValue::Float(f64::NEG_INFINITY)),
                    "nan" => Ok(OptionValue::Float(f64::NAN)),
                    _ => Err(self.error_at(token.location(), DslError::InvalidNegativeValue)),
                }
            }
            TokenKind::Integer => {
                let value = self.consume_integer("option value")?;
                if !negative {
                    return Ok(OptionValue::PositiveInt(value));
                }
                if value > 1u64 << 63 {
                    return Err(self.error_at(
                        token.location(),
                        DslError::IntegerOutOfRange {
                            text: format!("-{}", token.text),
                        },
                    ));
                }
                Ok(OptionValue::NegativeInt((-i128::from(value)) as i64))
            }
            TokenKind::Float => {
                let value: f64 = token
                    .text
                    .parse()
                    .map_err(|_| self.unexpected("float literal"))?;
                self.bump();
                Ok(OptionValue::Float(if negative { -value } else { value }))
            }
            TokenKind::String if !negative => {
                Ok(OptionValue::String(self.consume_string("option value")?))
            }
            TokenKind::Symbol if token.is("{") && !negative => {
                Ok(OptionValue::Aggregate(self.parse_aggregate()?))
            }
            _ => Err(self.unexpected("option value")),
        }
    }

    /// aggregate = "{" balanced tokens "}", kept as space-separated source
    /// text for the linker to interpret.
    fn parse_aggregate(&mut self) -> PResult<String> {
        self.consume("{")?;
        let mut depth = 1usize;
        let mut parts = Vec::new();
        loop {
            if self.at_end() {
                return Err(self.error_here(DslError::UnexpectedEndOfInput {
                    context: "aggregate value",
                }));
            }
            if self.at("{") {
                depth += 1;
            } else if self.at("}") {
                depth -= 1;
                if depth == 0 {
                    self.bump();
                    break;
                }
            }
            parts.push(self.current().text.clone());
            self.bump();
        }
        Ok(parts.join(" "))
    }
}

/// Parses decimal, `0x` hex and leading-zero octal integer literals.
fn parse_integer(text: &str) -> Result<u64, DslError> {
    let out_of_range = || DslError::IntegerOutOfRange {
        text: text.to_string(),
    };
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_err(|_| out_of_range());
    }
    if text.len() > 1 && text.starts_with('0') {
        let digits = &text[1..];
        if !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(DslError::InvalidOctal {
                text: text.to_string(),
            });
        }
        return u64::from_str_radix(digits, 8).map_err(|_| out_of_range());
    }
    text.parse().map_err(|_| out_of_range())
}

/// Largest magnitude a default of the given integer type may have.
fn integer_limit(scalar: ScalarType, negative: bool) -> u64 {
    match scalar {
        ScalarType::Int32 | ScalarType::Sint32 | ScalarType::Sfixed32 => {
            if negative {
                1 << 31
            } else {
                i32::MAX as u64
            }
        }
        ScalarType::Int64 | ScalarType::Sint64 | ScalarType::Sfixed64 => {
            if negative {
                1 << 63
            } else {
                i64::MAX as u64
            }
        }
        ScalarType::Uint32 | ScalarType::Fixed32 => u64::from(u32::MAX),
        _ => u64::MAX,
    }
}

/// `my_field` becomes `MyFieldEntry`.
pub fn map_entry_name(field_name: &str) -> String {
    let mut out = String::with_capacity(field_name.len() + 5);
    let mut upper_next = true;
    for c in field_name.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out.push_str("Entry");
    out
}

/// Parses one schema source text.
///
/// Errors and warnings go to `collector`; positions and comments of every
/// declaration are recorded into `locations`.
///
/// # Errors
///
/// Returns [`ParseFailed`] with the partial tree if any error was reported.
pub fn parse<C: ErrorCollector>(
    source: &str,
    collector: C,
    locations: &mut SourceLocationTable,
) -> Result<FileSchema, ParseFailed> {
    parse_with_options(source, collector, locations, ParserOptions::default())
}

/// [`parse`] with explicit lexer and parser settings.
///
/// # Errors
///
/// Returns [`ParseFailed`] with the partial tree if any error was reported.
pub fn parse_with_options<C: ErrorCollector>(
    source: &str,
    collector: C,
    locations: &mut SourceLocationTable,
    options: ParserOptions,
) -> Result<FileSchema, ParseFailed> {
    let mut tokenizer = Tokenizer::with_options(source, collector, options.lexer);
    Parser::new(&mut tokenizer, locations, options).parse_file()
}
