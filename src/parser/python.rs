// Python declaration extraction using tree-sitter

use crate::error::{Error, Result};
use crate::parser::ast::*;
use crate::parser::classify::{annotation_type_names, classify_value, AttributeSource, Scope};
use std::collections::HashMap;
use tracing::{debug, warn};
use tree_sitter::{Node, Parser};

/// Extracts raw declarations from one Python source unit
///
/// Holds a tree-sitter parser, so keep one extractor per worker thread.
pub struct UnitExtractor {
    parser: Parser,
}

impl UnitExtractor {
    /// Create a new extractor
    pub fn new() -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_python::language();
        parser
            .set_language(&language)
            .map_err(|e| Error::parser(format!("Failed to set Python language: {}", e)))?;
        Ok(Self { parser })
    }

    /// Extract declarations from a unit
    ///
    /// Never fails: a unit whose tree contains syntax errors yields no
    /// declarations and a single parse-failure diagnostic.
    pub fn extract(&mut self, unit: &SourceUnit) -> UnitDeclarations {
        let tree = match self.parser.parse(&unit.text, None) {
            Some(tree) => tree,
            None => {
                warn!(module = %unit.module, "parser produced no tree");
                return UnitDeclarations::failed(unit, None, "parser produced no syntax tree");
            }
        };

        let root = tree.root_node();
        if root.has_error() {
            let line = first_error_line(&root);
            warn!(module = %unit.module, line = ?line, "syntax error, unit skipped");
            return UnitDeclarations::failed(unit, line, "syntax error");
        }

        let source = unit.text.as_bytes();
        let mut decls = UnitDeclarations::new(unit.module.clone(), unit.path.clone());
        decls.docstring = extract_module_docstring(&root, source);

        collect_imports(&root, source, &mut decls.imports);
        let imported = imported_names(&decls.imports);

        for child in block_statements(&root) {
            match child.kind() {
                "class_definition" => {
                    if let Some(class) = parse_class(&child, source, Vec::new(), &imported) {
                        decls.classes.push(class);
                    }
                }
                "function_definition" => {
                    if let Some(func) = parse_function(&child, source, Vec::new()) {
                        decls.functions.push(func);
                    }
                }
                "decorated_definition" => {
                    let decorators = extract_decorators(&child, source);
                    match child.child_by_field_name("definition") {
                        Some(def) if def.kind() == "class_definition" => {
                            if let Some(class) = parse_class(&def, source, decorators, &imported) {
                                decls.classes.push(class);
                            }
                        }
                        Some(def) if def.kind() == "function_definition" => {
                            if let Some(func) = parse_function(&def, source, decorators) {
                                decls.functions.push(func);
                            }
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        debug!(
            module = %decls.module,
            classes = decls.classes.len(),
            functions = decls.functions.len(),
            imports = decls.imports.len(),
            "extracted unit"
        );

        decls
    }
}

fn position(node: &Node) -> Position {
    let start = node.start_position();
    Position::new(start.row + 1, start.column + 1)
}

/// Line of the first error or missing node
fn first_error_line(node: &Node) -> Option<usize> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position().row + 1);
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if child.has_error() || child.is_missing() {
            if let Some(line) = first_error_line(&child) {
                return Some(line);
            }
        }
    }
    None
}

/// Map each name bound by an import to the name it refers to
fn imported_names(imports: &[Import]) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for import in imports {
        for name in &import.names {
            if name.name == "*" {
                continue;
            }
            names
                .entry(name.used_name().to_string())
                .or_insert_with(|| name.name.clone());
        }
    }
    names
}

/// Extract module docstring from root node
fn extract_module_docstring(root: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = root.walk();
    for child in root.children(&mut cursor) {
        if child.kind() == "expression_statement" {
            return statement_docstring(&child, source);
        } else if child.kind() != "comment" {
            break;
        }
    }
    None
}

fn statement_docstring(statement: &Node, source: &[u8]) -> Option<String> {
    let mut cursor = statement.walk();
    let first = statement.named_children(&mut cursor).next()?;
    if first.kind() == "string" {
        extract_string_content(&first, source)
    } else {
        None
    }
}

/// Extract string content, handling triple-quoted strings and prefixes
fn extract_string_content(node: &Node, source: &[u8]) -> Option<String> {
    let text = node.utf8_text(source).ok()?;
    let text = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());

    let s = if text.len() >= 6 && (text.starts_with("\"\"\"") || text.starts_with("'''")) {
        &text[3..text.len() - 3]
    } else if text.len() >= 2 && (text.starts_with('"') || text.starts_with('\'')) {
        &text[1..text.len() - 1]
    } else {
        text
    };

    Some(s.trim().to_string())
}

/// Statement kinds whose blocks still belong to the enclosing scope
const COMPOUND_STATEMENTS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "except_group_clause",
    "finally_clause",
    "with_statement",
    "for_statement",
    "while_statement",
    "match_statement",
    "case_clause",
];

/// Statements of a module or class body in source order
///
/// Conditional and guarded blocks (`if`, `try`, `with`, loops, `match`) are
/// flattened into the enclosing scope. Function and class bodies are not
/// entered.
fn block_statements<'t>(body: &Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    flatten_block(body, &mut out);
    out
}

fn flatten_block<'t>(block: &Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = block.walk();
    for child in block.named_children(&mut cursor) {
        if COMPOUND_STATEMENTS.contains(&child.kind()) {
            flatten_compound(&child, out);
        } else {
            out.push(child);
        }
    }
}

/// Follow only the blocks and clauses of a compound statement, not its
/// conditions or subjects
fn flatten_compound<'t>(node: &Node<'t>, out: &mut Vec<Node<'t>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "block" {
            flatten_block(&child, out);
        } else if COMPOUND_STATEMENTS.contains(&child.kind()) {
            flatten_compound(&child, out);
        }
    }
}

/// Collect imports from the whole tree, including nested blocks
fn collect_imports(node: &Node, source: &[u8], out: &mut Vec<Import>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "import_statement" => out.extend(parse_import(&child, source)),
            "import_from_statement" | "future_import_statement" => {
                if let Some(import) = parse_import_from(&child, source) {
                    out.push(import);
                }
            }
            _ => collect_imports(&child, source, out),
        }
    }
}

/// Parse an import statement: `import x, y as z` gives one import per module
fn parse_import(node: &Node, source: &[u8]) -> Vec<Import> {
    let line = node.start_position().row + 1;
    let mut imports = Vec::new();

    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "dotted_name" => {
                if let Ok(module) = child.utf8_text(source) {
                    imports.push(Import::simple(module, line));
                }
            }
            "aliased_import" => {
                let name = child
                    .child_by_field_name("name")
                    .and_then(|n| n.utf8_text(source).ok());
                let alias = child
                    .child_by_field_name("alias")
                    .and_then(|n| n.utf8_text(source).ok());
                if let (Some(name), Some(alias)) = (name, alias) {
                    let mut import = Import::simple(name, line);
                    import.names = vec![ImportedName::with_alias(name, alias)];
                    imports.push(import);
                }
            }
            _ => {}
        }
    }

    imports
}

/// Parse an import-from statement: `from x import y`
fn parse_import_from(node: &Node, source: &[u8]) -> Option<Import> {
    let line = node.start_position().row + 1;
    let mut module = String::new();
    let mut names = Vec::new();
    let mut relative_level = 0;
    let mut seen_import_keyword = false;

    if node.kind() == "future_import_statement" {
        module = "__future__".to_string();
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "relative_import" => {
                let mut inner_cursor = child.walk();
                for inner in child.children(&mut inner_cursor) {
                    match inner.kind() {
                        "import_prefix" => {
                            relative_level = inner
                                .utf8_text(source)
                                .ok()?
                                .chars()
                                .filter(|c| *c == '.')
                                .count();
                        }
                        "dotted_name" => {
                            module = inner.utf8_text(source).ok()?.to_string();
                        }
                        _ => {}
                    }
                }
            }
            "dotted_name" => {
                let text = child.utf8_text(source).ok()?;
                if !seen_import_keyword {
                    module = text.to_string();
                } else {
                    names.push(ImportedName::new(text));
                }
            }
            "import" => {
                seen_import_keyword = true;
            }
            "wildcard_import" => {
                names.push(ImportedName::new("*"));
            }
            "aliased_import" => {
                let name = child.child_by_field_name("name")?.utf8_text(source).ok()?;
                let alias = child.child_by_field_name("alias")?.utf8_text(source).ok()?;
                names.push(ImportedName::with_alias(name, alias));
            }
            _ => {}
        }
    }

    if module.is_empty() && relative_level == 0 {
        return None;
    }

    if relative_level > 0 {
        Some(Import::relative(&module, names, relative_level, line))
    } else {
        Some(Import::from_import(&module, names, line))
    }
}

/// Parse a class definition (the `class_definition` node itself)
fn parse_class(
    node: &Node,
    source: &[u8],
    decorators: Vec<String>,
    imported: &HashMap<String, String>,
) -> Option<Class> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;

    let mut class = Class::new(name, position(node));
    class.line_end = node.end_position().row + 1;
    class.decorators = decorators;

    if let Some(superclasses) = node.child_by_field_name("superclasses") {
        class.bases = extract_bases(&superclasses, source);
    }

    if let Some(body) = node.child_by_field_name("body") {
        parse_class_body(&body, source, imported, &mut class);
    }

    Some(class)
}

/// Extract base classes from the superclass argument list
///
/// Keyword arguments such as `metaclass=ABCMeta` are not bases.
fn extract_bases(node: &Node, source: &[u8]) -> Vec<String> {
    let mut bases = Vec::new();
    let mut cursor = node.walk();

    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "identifier" | "attribute" | "subscript" | "call" => {
                if let Ok(text) = child.utf8_text(source) {
                    bases.push(text.to_string());
                }
            }
            _ => {}
        }
    }

    bases
}

/// Parse class body: docstring, methods, class-level fields
fn parse_class_body(
    body: &Node,
    source: &[u8],
    imported: &HashMap<String, String>,
    class: &mut Class,
) {
    let mut cursor = body.walk();
    class.docstring = body
        .named_children(&mut cursor)
        .find(|c| c.kind() != "comment")
        .filter(|c| c.kind() == "expression_statement")
        .and_then(|c| statement_docstring(&c, source));

    for child in block_statements(body) {
        match child.kind() {
            "expression_statement" => {
                parse_class_field(&child, source, imported, class);
            }
            "function_definition" => {
                parse_method(&child, source, Vec::new(), imported, class);
            }
            "decorated_definition" => {
                let decorators = extract_decorators(&child, source);
                if let Some(def) = child.child_by_field_name("definition") {
                    if def.kind() == "function_definition" {
                        parse_method(&def, source, decorators, imported, class);
                    }
                }
            }
            _ => {}
        }
    }
}

/// Record a class-level assignment or annotation
fn parse_class_field(
    statement: &Node,
    source: &[u8],
    imported: &HashMap<String, String>,
    class: &mut Class,
) {
    let mut cursor = statement.walk();
    let assignments: Vec<Node> = statement
        .named_children(&mut cursor)
        .filter(|c| c.kind() == "assignment")
        .collect();

    let scope = Scope::class_body(imported);
    for assignment in assignments {
        let (targets, value) = assignment_chain(&assignment);
        for (left, annotation) in targets {
            if left.kind() != "identifier" {
                continue;
            }
            let Ok(name) = left.utf8_text(source) else {
                continue;
            };
            record_assignment(name, false, false, &left, annotation, value, source, &scope, class);
        }
    }
}

/// Parse a method and scan its body for receiver attribute assignments
fn parse_method(
    node: &Node,
    source: &[u8],
    decorators: Vec<String>,
    imported: &HashMap<String, String>,
    class: &mut Class,
) {
    let Some(method) = parse_function(node, source, decorators) else {
        return;
    };

    if let (Some(receiver), Some(body)) = (method.instance_receiver(), node.child_by_field_name("body")) {
        let scope = Scope::method(method.explicit_parameters(), imported);
        let in_init = method.name == "__init__";
        scan_receiver_assignments(&body, source, receiver, in_init, &scope, class);
    }

    class.methods.push(method);
}

/// Walk a method body for `receiver.attr = ...`, skipping nested scopes
fn scan_receiver_assignments(
    node: &Node,
    source: &[u8],
    receiver: &str,
    in_init: bool,
    scope: &Scope<'_>,
    class: &mut Class,
) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        match child.kind() {
            "function_definition" | "class_definition" | "decorated_definition" | "lambda" => {}
            "assignment" => {
                let (targets, value) = assignment_chain(&child);
                for (left, annotation) in targets {
                    if let Some(attr) = receiver_attribute(&left, source, receiver) {
                        record_assignment(attr, true, in_init, &left, annotation, value, source, scope, class);
                    }
                }
            }
            _ => scan_receiver_assignments(&child, source, receiver, in_init, scope, class),
        }
    }
}

/// Targets (with their annotations) and final value of `a = b = value`
fn assignment_chain<'t>(node: &Node<'t>) -> (Vec<(Node<'t>, Option<Node<'t>>)>, Option<Node<'t>>) {
    let mut targets = Vec::new();
    let mut current = *node;
    loop {
        if let Some(left) = current.child_by_field_name("left") {
            targets.push((left, current.child_by_field_name("type")));
        }
        match current.child_by_field_name("right") {
            Some(right) if right.kind() == "assignment" => current = right,
            value => return (targets, value),
        }
    }
}

/// `self.engine` gives `engine` when `self` is the receiver
fn receiver_attribute<'s>(node: &Node, source: &'s [u8], receiver: &str) -> Option<&'s str> {
    if node.kind() != "attribute" {
        return None;
    }
    let object = node.child_by_field_name("object")?;
    if object.kind() != "identifier" || object.utf8_text(source).ok()? != receiver {
        return None;
    }
    node.child_by_field_name("attribute")?.utf8_text(source).ok()
}

#[allow(clippy::too_many_arguments)]
fn record_assignment(
    name: &str,
    is_instance: bool,
    in_init: bool,
    target: &Node,
    annotation: Option<Node>,
    value: Option<Node>,
    source: &[u8],
    scope: &Scope<'_>,
    class: &mut Class,
) {
    let line = target.start_position().row + 1;
    let annotation_text = annotation.and_then(|a| a.utf8_text(source).ok());
    let classified = value.and_then(|v| classify_value(&v, source, scope));

    let mut attribute = Attribute::new(name, line, is_instance);
    attribute.declared_in_init = in_init;
    attribute.type_hint = match (annotation_text, &classified) {
        (Some(text), _) => Some(text.to_string()),
        (None, Some(AttributeSource::ConstructorCall { callee })) => Some(callee.clone()),
        _ => None,
    };
    class.add_attribute(attribute);

    if let Some(text) = annotation_text {
        for type_name in annotation_type_names(text) {
            class.add_observation(AttributeObservation {
                attribute: name.to_string(),
                source: AttributeSource::Annotation {
                    annotation: type_name,
                },
                line,
            });
        }
    }

    if let Some(observed) = classified {
        class.add_observation(AttributeObservation {
            attribute: name.to_string(),
            source: observed,
            line,
        });
    }
}

/// Parse a function definition node
fn parse_function(node: &Node, source: &[u8], decorators: Vec<String>) -> Option<Function> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;

    let mut func = Function::new(name, position(node));
    func.line_end = node.end_position().row + 1;
    func.decorators = decorators;
    func.is_async = has_async_keyword(node);

    if let Some(params) = node.child_by_field_name("parameters") {
        func.parameters = parse_parameters(&params, source);
    }

    if let Some(ret) = node.child_by_field_name("return_type") {
        func.return_type = ret.utf8_text(source).ok().map(str::to_string);
    }

    if let Some(body) = node.child_by_field_name("body") {
        let mut cursor = body.walk();
        let first = body.named_children(&mut cursor).find(|c| c.kind() != "comment");
        if let Some(first) = first {
            if first.kind() == "expression_statement" {
                func.docstring = statement_docstring(&first, source);
            }
        }
    }

    Some(func)
}

/// Check if a function_definition node has an async keyword
fn has_async_keyword(node: &Node) -> bool {
    let mut cursor = node.walk();
    let found = node.children(&mut cursor).any(|c| c.kind() == "async");
    found
}

/// Decorators of a decorated definition, verbatim without `@`
fn extract_decorators(node: &Node, source: &[u8]) -> Vec<String> {
    let mut decorators = Vec::new();
    let mut cursor = node.walk();

    for child in node.children(&mut cursor) {
        if child.kind() == "decorator" {
            if let Ok(text) = child.utf8_text(source) {
                decorators.push(text.trim_start_matches('@').trim().to_string());
            }
        }
    }

    decorators
}

/// Parse function parameters
fn parse_parameters(node: &Node, source: &[u8]) -> Vec<Parameter> {
    let mut params = Vec::new();
    let mut cursor = node.walk();
    let mut seen_star = false;

    for child in node.named_children(&mut cursor) {
        let kind = if seen_star {
            ParameterKind::KeywordOnly
        } else {
            ParameterKind::Regular
        };

        match child.kind() {
            "identifier" => {
                let mut param = Parameter::new(child.utf8_text(source).unwrap_or("?"));
                param.kind = kind;
                params.push(param);
            }
            "typed_parameter" => {
                if let Some(mut param) = parse_typed_parameter(&child, source) {
                    if param.kind == ParameterKind::Regular {
                        param.kind = kind;
                    } else if param.kind == ParameterKind::Args {
                        seen_star = true;
                    }
                    params.push(param);
                }
            }
            "default_parameter" | "typed_default_parameter" => {
                if let Some(mut param) = parse_default_parameter(&child, source) {
                    param.kind = kind;
                    params.push(param);
                }
            }
            "list_splat_pattern" | "dictionary_splat_pattern" => {
                if let Some(param) = parse_splat(&child, source) {
                    if param.kind == ParameterKind::Args {
                        seen_star = true;
                    }
                    params.push(param);
                }
            }
            "keyword_separator" => {
                seen_star = true;
            }
            "positional_separator" => {
                for param in params.iter_mut() {
                    if param.kind == ParameterKind::Regular {
                        param.kind = ParameterKind::PositionalOnly;
                    }
                }
            }
            _ => {}
        }
    }

    params
}

/// `*args` or `**kwargs`
fn parse_splat(node: &Node, source: &[u8]) -> Option<Parameter> {
    let mut cursor = node.walk();
    let ident = node
        .named_children(&mut cursor)
        .find(|c| c.kind() == "identifier")?;
    let mut param = Parameter::new(ident.utf8_text(source).ok()?);
    param.kind = if node.kind() == "list_splat_pattern" {
        ParameterKind::Args
    } else {
        ParameterKind::Kwargs
    };
    Some(param)
}

fn parse_typed_parameter(node: &Node, source: &[u8]) -> Option<Parameter> {
    let mut cursor = node.walk();
    let target = node.named_children(&mut cursor).next()?;

    let mut param = match target.kind() {
        "identifier" => Parameter::new(target.utf8_text(source).ok()?),
        "list_splat_pattern" | "dictionary_splat_pattern" => parse_splat(&target, source)?,
        _ => return None,
    };
    param.type_hint = node
        .child_by_field_name("type")
        .and_then(|t| t.utf8_text(source).ok())
        .map(str::to_string);
    Some(param)
}

/// Parse `name=value` or `name: T = value`
fn parse_default_parameter(node: &Node, source: &[u8]) -> Option<Parameter> {
    let name = node.child_by_field_name("name")?.utf8_text(source).ok()?;

    let mut param = Parameter::new(name);
    param.type_hint = node
        .child_by_field_name("type")
        .and_then(|t| t.utf8_text(source).ok())
        .map(str::to_string);
    param.default = node
        .child_by_field_name("value")
        .and_then(|v| v.utf8_text(source).ok())
        .map(str::to_string);
    Some(param)
}
