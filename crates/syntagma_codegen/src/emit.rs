//! The source emitter.
//!
//! Produces the two generated files. The contract is structural:
//! tokens enum, token descriptor table, keyword table, value pool and
//! parser facade in the header; nonterminal enum, shift/goto/reduce
//! arrays, state table, start-state pointers and action functions in
//! the implementation file. Orderings follow the dense indices of the
//! converted grammar and the generated automaton.

use crate::config::GeneratorConfig;
use std::fmt::Write;
use syntagma_grammar::convert::action::{Action, ConstPayload};
use syntagma_grammar::convert::descriptor::{RunType, RunTypeId, TrDescriptor, TypeTable};
use syntagma_grammar::convert::ConversionResult;
use syntagma_lr::{LrTables, SymRef};

/// Include guard: uppercase alphanumerics, everything else `_`, plus
/// `_INCLUDED`.
pub fn include_guard(file_name: &str) -> String {
    let mut guard: String = file_name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    guard.push_str("_INCLUDED");
    guard
}

/// C++ spelling of a converted type.
fn type_name(types: &TypeTable, config: &GeneratorConfig, ty: RunTypeId) -> String {
    match types.get(ty) {
        RunType::Void => "void".to_string(),
        RunType::Primitive { name, system } => {
            if *system {
                format!("syn::{name}")
            } else {
                match config.types_namespace() {
                    Some(ns) => format!("{ns}::{name}"),
                    None => name.clone(),
                }
            }
        }
        RunType::Class { name, .. } => match config.classes_namespace() {
            Some(ns) => format!("{ns}::{name}*"),
            None => format!("{name}*"),
        },
        RunType::PartClass { class, tag } => format!("{}*", part_class_name(types, *class, *tag)),
        RunType::List { element } => {
            format!("syn::ListPtr< {} >", type_name(types, config, *element))
        }
    }
}

/// Name of the generated struct behind a part-class type.
fn part_class_name(types: &TypeTable, class: RunTypeId, tag: u32) -> String {
    match types.get(class) {
        RunType::Class { name, .. } => format!("Part_{name}_{tag}"),
        _ => panic!("illegal state: part of a non-class"),
    }
}

/// Value-carrying primitive types of all terminals, in first-use
/// order.
fn token_value_types(conversion: &ConversionResult) -> Vec<RunTypeId> {
    let mut seen = Vec::new();
    for tr in conversion.bnf.terminals() {
        let ty = tr.payload.ty();
        if !conversion.types.is_void(ty) && !seen.contains(&ty) {
            seen.push(ty);
        }
    }
    seen
}

fn primitive_member(types: &TypeTable, ty: RunTypeId) -> String {
    match types.get(ty) {
        RunType::Primitive { name, .. } => format!("v_{name}"),
        _ => panic!("illegal state: token value of a non-primitive type"),
    }
}

fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' | '\\' => {
                out.push('\\');
                out.push(ch);
            }
            '\r' => out.push_str("\\r"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

/// Generates the header file.
pub fn header_file(
    config: &GeneratorConfig,
    conversion: &ConversionResult,
    header_name: &str,
) -> String {
    let mut out = String::new();
    let guard = include_guard(header_name);
    let types = &conversion.types;

    let _ = writeln!(out, "//Generated by syntagma. Do not edit.");
    let _ = writeln!(out, "#ifndef {guard}");
    let _ = writeln!(out, "#define {guard}\n");

    for include in &config.include_files {
        if include.system {
            let _ = writeln!(out, "#include <{}>", include.name);
        } else {
            let _ = writeln!(out, "#include \"{}\"", include.name);
        }
    }
    let _ = writeln!(out, "#include \"syn.h\"\n");

    if let Some(ns) = &config.namespace_code {
        let _ = writeln!(out, "namespace {ns} {{\n");
    }

    // Tokens enum: END_OF_FILE first, then every terminal in grammar
    // order under its BNF name.
    let _ = writeln!(out, "enum Tokens {{");
    let _ = writeln!(out, "\tEND_OF_FILE = 0,");
    for tr in conversion.bnf.terminals() {
        let _ = writeln!(out, "\t{},", tr.name);
    }
    let _ = writeln!(out, "}};\n");

    let token_count = conversion.bnf.terminals().len() + 1;
    let _ = writeln!(
        out,
        "extern const syn::TokenDescriptor g_token_descriptors[{token_count}];\n"
    );

    // Keyword table: identifier-like string literals.
    let keyword_count = conversion
        .bnf
        .terminals()
        .iter()
        .filter(|tr| matches!(tr.payload, TrDescriptor::Str { is_keyword_like: true, .. }))
        .count();
    let _ = writeln!(out, "struct Keyword {{");
    let _ = writeln!(out, "\tconst char* const text;");
    let _ = writeln!(out, "\tconst Tokens token;");
    let _ = writeln!(out, "}};\n");
    let _ = writeln!(out, "extern const Keyword g_keywords[{}];\n", keyword_count + 1);

    // Token value record and pool.
    let value_types = token_value_types(conversion);
    let _ = writeln!(out, "struct TokenValue {{");
    for &ty in &value_types {
        let _ = writeln!(
            out,
            "\t{} {};",
            type_name(types, config, ty),
            primitive_member(types, ty)
        );
    }
    let _ = writeln!(out, "}};\n");

    let _ = writeln!(out, "class ValuePool {{");
    let _ = writeln!(out, "public:");
    let _ = writeln!(
        out,
        "\tconst void* allocate_value(syn::InternalTk token, const TokenValue& value);"
    );
    let _ = writeln!(out, "\nprivate:");
    for &ty in &value_types {
        let _ = writeln!(
            out,
            "\tsyn::Pool< {} > m_{}_pool;",
            type_name(types, config, ty),
            primitive_member(types, ty)
        );
    }
    let _ = writeln!(out, "}};\n");

    // Parser facade: one function per start nonterminal.
    let _ = writeln!(out, "class SynParser {{");
    let _ = writeln!(out, "public:");
    for &start in &conversion.start_nts {
        let nt = conversion.bnf.nt(start);
        let name = nt
            .payload
            .user_name()
            .expect("illegal state: auto nonterminal as a start symbol");
        let ret = type_name(types, config, nt.payload.ty());
        let _ = writeln!(
            out,
            "\tstatic {ret} parse_{name}(syn::ScannerInterface& scanner);"
        );
    }
    let _ = writeln!(out, "}};\n");

    if let Some(ns) = &config.namespace_code {
        let _ = writeln!(out, "}}//namespace {ns}\n");
    }
    let _ = writeln!(out, "#endif//{guard}");
    out
}

/// Generates the implementation file.
pub fn impl_file(
    config: &GeneratorConfig,
    conversion: &ConversionResult,
    lr: &LrTables,
    header_name: &str,
) -> String {
    let mut out = String::new();
    let types = &conversion.types;
    let bnf = &conversion.bnf;

    let _ = writeln!(out, "//Generated by syntagma. Do not edit.");
    let _ = writeln!(out, "#include \"{header_name}\"\n");

    if let Some(ns) = &config.namespace_code {
        let _ = writeln!(out, "namespace {ns} {{\n");
    }

    // Nonterminal enum, used by goto rows.
    let _ = writeln!(out, "enum Nonterminals {{");
    for nt in bnf.nonterminals() {
        let _ = writeln!(out, "\t{},", nt.name);
    }
    let _ = writeln!(out, "}};\n");

    emit_token_descriptors(&mut out, conversion);
    emit_keywords(&mut out, conversion);
    emit_value_pool(&mut out, conversion);
    emit_part_classes(&mut out, config, conversion);
    emit_actions(&mut out, config, conversion);
    emit_tables(&mut out, conversion, lr);
    emit_parse_functions(&mut out, config, conversion, lr);

    if let Some(ns) = &config.namespace_code {
        let _ = writeln!(out, "}}//namespace {ns}");
    }
    out
}

fn emit_token_descriptors(out: &mut String, conversion: &ConversionResult) {
    let token_count = conversion.bnf.terminals().len() + 1;
    let _ = writeln!(
        out,
        "const syn::TokenDescriptor g_token_descriptors[{token_count}] = {{"
    );
    let _ = writeln!(out, "\t{{ \"END_OF_FILE\", \"\" }},");
    for tr in conversion.bnf.terminals() {
        let text = match &tr.payload {
            TrDescriptor::Name { name, .. } => name.clone(),
            TrDescriptor::Str { text, .. } => text.clone(),
        };
        let _ = writeln!(out, "\t{{ {}, {} }},", quote(&tr.name), quote(&text));
    }
    let _ = writeln!(out, "}};\n");
}

fn emit_keywords(out: &mut String, conversion: &ConversionResult) {
    let keywords: Vec<(&str, &str)> = conversion
        .bnf
        .terminals()
        .iter()
        .filter_map(|tr| match &tr.payload {
            TrDescriptor::Str {
                text,
                is_keyword_like: true,
                ..
            } => Some((text.as_str(), tr.name.as_str())),
            _ => None,
        })
        .collect();

    let _ = writeln!(out, "const Keyword g_keywords[{}] = {{", keywords.len() + 1);
    for (text, token) in keywords {
        let _ = writeln!(out, "\t{{ {}, {} }},", quote(text), token);
    }
    let _ = writeln!(out, "\t{{ nullptr, END_OF_FILE }},");
    let _ = writeln!(out, "}};\n");
}

fn emit_value_pool(out: &mut String, conversion: &ConversionResult) {
    let types = &conversion.types;
    let _ = writeln!(
        out,
        "const void* ValuePool::allocate_value(syn::InternalTk token, const TokenValue& value) {{"
    );
    let _ = writeln!(out, "\tswitch (token) {{");
    for tr in conversion.bnf.terminals() {
        let ty = tr.payload.ty();
        if types.is_void(ty) {
            continue;
        }
        let member = primitive_member(types, ty);
        let _ = writeln!(out, "\tcase {}:", tr.name);
        let _ = writeln!(out, "\t\treturn m_{member}_pool.allocate(value.{member});");
    }
    let _ = writeln!(out, "\tdefault:");
    let _ = writeln!(out, "\t\treturn nullptr;");
    let _ = writeln!(out, "\t}}");
    let _ = writeln!(out, "}}\n");
}

/// Structs for synthesized part-classes, each with an `apply` function
/// moving its fields onto the final object.
fn emit_part_classes(out: &mut String, config: &GeneratorConfig, conversion: &ConversionResult) {
    let types = &conversion.types;
    for pr in conversion.bnf.productions() {
        let action = &pr.payload.action;
        let (part, fields) = match action {
            Action::PartClass { part, fields } => (*part, fields),
            _ => continue,
        };
        let (class, tag) = match types.get(part) {
            RunType::PartClass { class, tag } => (*class, *tag),
            _ => panic!("illegal state: part action without a part type"),
        };
        let struct_name = part_class_name(types, class, tag);
        let class_ty = type_name(types, config, class);

        let _ = writeln!(out, "struct {struct_name} {{");
        for (offset, attr) in &fields.attributes {
            let element_ty = element_type(conversion, pr.index.index(), *offset);
            let _ = writeln!(
                out,
                "\t{} {};",
                type_name(types, config, element_ty),
                config.attr_member_name(attr)
            );
        }
        let _ = writeln!(out, "\n\tvoid apply({class_ty} target) const {{");
        for (_, attr) in &fields.attributes {
            let member = config.attr_member_name(attr);
            if config.use_attr_setters {
                let _ = writeln!(out, "\t\ttarget->set_{attr}({member});");
            } else {
                let _ = writeln!(out, "\t\ttarget->{member} = {member};");
            }
        }
        let _ = writeln!(out, "\t}}");
        let _ = writeln!(out, "}};\n");
    }
}

fn element_type(conversion: &ConversionResult, pr_index: usize, offset: usize) -> RunTypeId {
    let pr = &conversion.bnf.productions()[pr_index];
    let sym = pr.elements[offset];
    match conversion.bnf.sym(sym) {
        SymRef::Tr(tr) => conversion.bnf.tr(tr).payload.ty(),
        SymRef::Nt(nt) => conversion.bnf.nt(nt).payload.ty(),
    }
}

fn allocate_expr(config: &GeneratorConfig, class_ty: &str) -> String {
    // `class_ty` is a pointer spelling; the bare class drops the star.
    let bare = class_ty.trim_end_matches('*').trim_end();
    match &config.allocator {
        Some(allocator) => format!("{allocator}< {bare} >::allocate()"),
        None => format!("new {bare}()"),
    }
}

fn const_expr_text(config: &GeneratorConfig, value: &ConstPayload) -> String {
    match value {
        ConstPayload::Integer(value) => value.to_string(),
        ConstPayload::Str(text) => quote(text),
        ConstPayload::Bool(value) => if *value { "true" } else { "false" }.to_string(),
        ConstPayload::Native(text) => {
            // A bare native expression picks up the native namespace;
            // one written with qualifiers is left alone.
            match config.native_namespace() {
                Some(ns) if !text.contains("::") => format!("{ns}::{text}"),
                _ => text.clone(),
            }
        }
    }
}

/// One action function per production, plus the dispatch table.
fn emit_actions(out: &mut String, config: &GeneratorConfig, conversion: &ConversionResult) {
    let types = &conversion.types;

    for pr in conversion.bnf.productions() {
        let index = pr.index.index();
        let nt_name = &conversion.bnf.nt(pr.nt).name;
        let elements: Vec<&str> = pr
            .elements
            .iter()
            .map(|&sym| conversion.bnf.sym_name(sym))
            .collect();
        let _ = writeln!(
            out,
            "//{} : {}",
            nt_name,
            if elements.is_empty() {
                "<empty>".to_string()
            } else {
                elements.join(" ")
            }
        );
        let _ = writeln!(
            out,
            "static const void* action_{index}(const syn::ProductionStack& stack) {{"
        );

        match &pr.payload.action {
            Action::Void => {
                let _ = writeln!(out, "\treturn nullptr;");
            }
            Action::Copy { .. } => {
                let _ = writeln!(out, "\treturn syn::value_of(stack[0]);");
            }
            Action::Cast { to, from } => {
                let to_ty = type_name(types, config, *to);
                let from_ty = type_name(types, config, *from);
                let _ = writeln!(
                    out,
                    "\treturn static_cast<{to_ty}>(static_cast<{from_ty}>(syn::value_of(stack[0])));"
                );
            }
            Action::ResultAnd { index, .. } => {
                let _ = writeln!(out, "\treturn syn::value_of(stack[{index}]);");
            }
            Action::FirstList { list } => {
                let element = match types.get(*list) {
                    RunType::List { element } => *element,
                    _ => panic!("illegal state: list action without a list type"),
                };
                let _ = writeln!(
                    out,
                    "\treturn syn::list_first< {} >(syn::value_of(stack[0]));",
                    type_name(types, config, element)
                );
            }
            Action::NextList { list, has_separator } => {
                let element = match types.get(*list) {
                    RunType::List { element } => *element,
                    _ => panic!("illegal state: list action without a list type"),
                };
                let last = if *has_separator { 2 } else { 1 };
                let _ = writeln!(
                    out,
                    "\treturn syn::list_next< {} >(syn::value_of(stack[0]), syn::value_of(stack[{last}]));",
                    type_name(types, config, element)
                );
            }
            Action::Class { class, fields } | Action::PartClass { part: class, fields } => {
                let is_part = matches!(&pr.payload.action, Action::PartClass { .. });
                let object_ty = type_name(types, config, *class);
                let _ = writeln!(
                    out,
                    "\t{object_ty} object = {};",
                    allocate_expr(config, &object_ty)
                );
                for (offset, attr) in &fields.attributes {
                    let field_ty = type_name(types, config, element_type(conversion, index, *offset));
                    let value = format!("static_cast<{field_ty}>(syn::value_of(stack[{offset}]))");
                    let member = config.attr_member_name(attr);
                    if config.use_attr_setters && !is_part {
                        let _ = writeln!(out, "\tobject->set_{attr}({value});");
                    } else {
                        let _ = writeln!(out, "\tobject->{member} = {value};");
                    }
                }
                for (offset, part_ty) in &fields.part_classes {
                    let part_spelling = type_name(types, config, *part_ty);
                    let _ = writeln!(
                        out,
                        "\tstatic_cast<{part_spelling}>(syn::value_of(stack[{offset}]))->apply(object);"
                    );
                }
                if let Some(offset) = fields.nested_class {
                    let _ = writeln!(
                        out,
                        "\tobject = static_cast<{object_ty}>(syn::value_of(stack[{offset}]));"
                    );
                }
                let _ = writeln!(out, "\treturn object;");
            }
            Action::Const { ty, value } => {
                let const_ty = type_name(types, config, *ty);
                let _ = writeln!(
                    out,
                    "\tstatic const {const_ty} k_value = {};",
                    const_expr_text(config, value)
                );
                let _ = writeln!(out, "\treturn &k_value;");
            }
        }

        let _ = writeln!(out, "}}\n");
    }

    let _ = writeln!(
        out,
        "typedef const void* (*ActionFn)(const syn::ProductionStack&);"
    );
    let _ = writeln!(
        out,
        "static const ActionFn g_actions[{}] = {{",
        conversion.bnf.productions().len()
    );
    for pr in conversion.bnf.productions() {
        let _ = writeln!(out, "\taction_{},", pr.index.index());
    }
    let _ = writeln!(out, "}};\n");
}

fn emit_tables(out: &mut String, conversion: &ConversionResult, lr: &LrTables) {
    let bnf = &conversion.bnf;
    let types = &conversion.types;
    let state_count = lr.states.len();

    let _ = writeln!(out, "extern const syn::State g_states[{state_count}];\n");

    for state in &lr.states {
        let index = state.index.index();
        if !state.shifts.is_empty() {
            let _ = writeln!(out, "static const syn::Shift g_shifts_{index}[] = {{");
            for &(tr, target) in &state.shifts {
                let _ = writeln!(
                    out,
                    "\t{{ &g_states[{}], {} }},",
                    target.index(),
                    bnf.tr(tr).name
                );
            }
            let _ = writeln!(out, "\t{{ nullptr, 0 }},");
            let _ = writeln!(out, "}};");
        }
        if !state.gotos.is_empty() {
            let _ = writeln!(out, "static const syn::Goto g_gotos_{index}[] = {{");
            for &(nt, target) in &state.gotos {
                let _ = writeln!(
                    out,
                    "\t{{ &g_states[{}], {} }},",
                    target.index(),
                    bnf.nt(nt).name
                );
            }
            let _ = writeln!(out, "\t{{ nullptr, 0 }},");
            let _ = writeln!(out, "}};");
        }
        if !state.reduces.is_empty() {
            let _ = writeln!(out, "static const syn::Reduce g_reduces_{index}[] = {{");
            for reduce in &state.reduces {
                match reduce {
                    Some(pr_idx) => {
                        let pr = bnf.pr(*pr_idx);
                        let _ = writeln!(
                            out,
                            "\t{{ {}, {}, {} }},",
                            pr.elements.len(),
                            bnf.nt(pr.nt).name,
                            pr_idx.index()
                        );
                    }
                    None => {
                        let _ = writeln!(out, "\t{{ 0, 0, syn::ACCEPT_ACTION }},");
                    }
                }
            }
            let _ = writeln!(out, "\t{{ 0, 0, syn::NULL_ACTION }},");
            let _ = writeln!(out, "}};");
        }
    }

    let _ = writeln!(out, "\nconst syn::State g_states[{state_count}] = {{");
    for state in &lr.states {
        let index = state.index.index();
        let shifts = if state.shifts.is_empty() {
            "nullptr".to_string()
        } else {
            format!("g_shifts_{index}")
        };
        let gotos = if state.gotos.is_empty() {
            "nullptr".to_string()
        } else {
            format!("g_gotos_{index}")
        };
        let reduces = if state.reduces.is_empty() {
            "nullptr".to_string()
        } else {
            format!("g_reduces_{index}")
        };
        let sym_type = match state.entry_sym {
            None => "syn::State::sym_none",
            Some(sym) => match bnf.sym(sym) {
                SymRef::Nt(_) => "syn::State::sym_nt",
                SymRef::Tr(tr) => {
                    if types.is_void(bnf.tr(tr).payload.ty()) {
                        "syn::State::sym_none"
                    } else {
                        "syn::State::sym_tk_value"
                    }
                }
            },
        };
        let _ = writeln!(
            out,
            "\t{{ {index}, {shifts}, {gotos}, {reduces}, {sym_type} }},"
        );
    }
    let _ = writeln!(out, "}};\n");

    for &(nt, state) in &lr.start_states {
        let name = bnf
            .nt(nt)
            .payload
            .user_name()
            .expect("illegal state: auto nonterminal as a start symbol");
        let _ = writeln!(
            out,
            "const syn::State* const g_start_state_{name} = &g_states[{}];",
            state.index()
        );
    }
    let _ = writeln!(out);
}

fn emit_parse_functions(
    out: &mut String,
    config: &GeneratorConfig,
    conversion: &ConversionResult,
    lr: &LrTables,
) {
    let types = &conversion.types;
    for &(nt, _) in &lr.start_states {
        let descriptor = &conversion.bnf.nt(nt).payload;
        let name = descriptor
            .user_name()
            .expect("illegal state: auto nonterminal as a start symbol");
        let ret = type_name(types, config, descriptor.ty());
        let _ = writeln!(
            out,
            "{ret} SynParser::parse_{name}(syn::ScannerInterface& scanner) {{"
        );
        let _ = writeln!(
            out,
            "\tstd::unique_ptr<syn::ParserInterface> parser = syn::ParserInterface::create();"
        );
        let _ = writeln!(
            out,
            "\tsyn::StackElement_Nt* root = parser->parse(g_start_state_{name}, scanner, END_OF_FILE);"
        );
        if ret == "void" {
            let _ = writeln!(out, "\tsyn::run_actions(g_actions, root);");
        } else {
            let _ = writeln!(
                out,
                "\treturn static_cast<{ret}>(syn::run_actions(g_actions, root));"
            );
        }
        let _ = writeln!(out, "}}\n");
    }
}
