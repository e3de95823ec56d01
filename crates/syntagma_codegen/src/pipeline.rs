//! The generator pipeline.
//!
//! Reads the grammar file, runs the front end, converts to BNF,
//! generates the LR tables, and writes the two output files. The
//! first error aborts the run before anything is written; both files
//! are rendered in memory first, so no partial output ever reaches
//! disk.

use crate::config::GeneratorConfig;
use crate::emit;
use std::fmt;
use std::fs;
use std::path::PathBuf;
use syntagma_base::{Arena, Interner, SynError};
use syntagma_grammar::analysis::GrammarBuilder;
use syntagma_grammar::convert::descriptor::TrDescriptor;
use syntagma_grammar::convert::{convert_grammar, ConversionResult};
use syntagma_grammar::types::TypeStore;
use syntagma_grammar::{parse_grammar, AstArenas};
use syntagma_lr::{generate_lr_tables, LrTables};

/// A failed generator run.
#[derive(Debug)]
pub enum GenError {
    Io { path: PathBuf, error: std::io::Error },
    /// Grammar problem, already rendered as `file:line:column:
    /// message`.
    Grammar(String),
}

impl fmt::Display for GenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenError::Io { path, error } => write!(f, "{}: {}", path.display(), error),
            GenError::Grammar(message) => f.write_str(message),
        }
    }
}

impl std::error::Error for GenError {}

/// Runs the whole generator for one grammar file.
pub fn run_generator(config: &GeneratorConfig) -> Result<(), GenError> {
    let source = fs::read_to_string(&config.input).map_err(|error| GenError::Io {
        path: config.input.clone(),
        error,
    })?;
    let file_name = config.input.display().to_string();

    let (conversion, lr) = build_tables(config, &source, &file_name)?;

    let base = config.output_base_path();
    let header_path = base.with_extension("h");
    let impl_path = base.with_extension("cpp");
    let header_name = header_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "syngen.h".to_string());

    // Render both files before writing either.
    let header_text = emit::header_file(config, &conversion, &header_name);
    let impl_text = emit::impl_file(config, &conversion, &lr, &header_name);

    fs::write(&header_path, header_text).map_err(|error| GenError::Io {
        path: header_path.clone(),
        error,
    })?;
    fs::write(&impl_path, impl_text).map_err(|error| GenError::Io {
        path: impl_path.clone(),
        error,
    })?;

    if config.verbose {
        println!("OK");
    }
    Ok(())
}

/// Front end + converter + LR generation, without touching the file
/// system. The returned tables are self-contained.
pub fn build_tables(
    config: &GeneratorConfig,
    source: &str,
    file_name: &str,
) -> Result<(ConversionResult, LrTables), GenError> {
    let mut interner = Interner::new();

    let decls = Arena::new();
    let exprs = Arena::new();
    let expr_refs = Arena::new();
    let consts = Arena::new();
    let const_refs = Arena::new();
    let names = Arena::new();
    let native_refs = Arena::new();
    let arenas = AstArenas {
        decls: &decls,
        exprs: &exprs,
        expr_refs: &expr_refs,
        consts: &consts,
        const_refs: &const_refs,
        names: &names,
        native_refs: &native_refs,
    };

    let render = |interner: &Interner, error: SynError| {
        GenError::Grammar(error.display(interner).to_string())
    };

    let grammar = match parse_grammar(arenas, &mut interner, source, file_name) {
        Ok(grammar) => grammar,
        Err(error) => return Err(render(&interner, error)),
    };

    let types = TypeStore::new(&mut interner);
    let mut builder = GrammarBuilder::new(&grammar, &interner, types, config.verbose);
    if let Err(error) = builder.build() {
        return Err(render(&interner, error));
    }

    let conversion = match convert_grammar(&builder) {
        Ok(conversion) => conversion,
        Err(error) => return Err(render(&interner, error)),
    };
    if conversion.start_nts.is_empty() {
        return Err(GenError::Grammar(format!(
            "{file_name}: Grammar has no start nonterminal (mark one with '@')"
        )));
    }

    if config.verbose {
        print_bnf(&conversion);
    }

    let lr = generate_lr_tables(&conversion.bnf, &conversion.start_nts);

    if config.verbose {
        print_lr(&conversion, &lr);
    }

    Ok((conversion, lr))
}

fn print_bnf(conversion: &ConversionResult) {
    println!("*** BNF GRAMMAR ***\n");
    for nt in conversion.bnf.nonterminals() {
        println!(
            "{} {{ {} }}",
            nt.name,
            conversion.types.describe(nt.payload.ty())
        );
        for (i, &pr_idx) in nt.productions.iter().enumerate() {
            let pr = conversion.bnf.pr(pr_idx);
            let mut line = String::new();
            line.push('\t');
            line.push(if i == 0 { ':' } else { '|' });
            for &sym in &pr.elements {
                line.push(' ');
                line.push_str(conversion.bnf.sym_name(sym));
            }
            println!("{line} {{ {:?} }}", pr.payload.action);
        }
        println!();
    }
}

fn print_lr(conversion: &ConversionResult, lr: &LrTables) {
    println!("*** LR STATES ***\n");
    for state in &lr.states {
        println!("=== {} ===", state.index.index());
        for &(tr, target) in &state.shifts {
            let name = match &conversion.bnf.tr(tr).payload {
                TrDescriptor::Name { name, .. } => name.clone(),
                TrDescriptor::Str { text, .. } => format!("'{text}'"),
            };
            println!("shift {} -> {}", name, target.index());
        }
        for &(nt, target) in &state.gotos {
            println!("goto {} -> {}", conversion.bnf.nt(nt).name, target.index());
        }
        for reduce in &state.reduces {
            match reduce {
                Some(pr) => println!("reduce {}", pr.index()),
                None => println!("accept"),
            }
        }
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALC: &str = "token NUMBER {int};\n@Expr : Expr '+' Term | Term ;\nTerm : NUMBER ;\n";

    #[test]
    fn build_tables_produces_grammar_and_states() {
        let config = GeneratorConfig::new("calc.syn");
        let (conversion, lr) = build_tables(&config, CALC, "calc.syn").expect("builds");
        assert_eq!(conversion.bnf.nonterminals().len(), 2);
        assert_eq!(conversion.bnf.terminals().len(), 2);
        assert_eq!(conversion.bnf.productions().len(), 3);
        assert!(lr.states.len() >= 5);
    }

    #[test]
    fn grammar_errors_are_rendered_with_positions() {
        let config = GeneratorConfig::new("bad.syn");
        let error = build_tables(&config, "@A : missing ;", "bad.syn").unwrap_err();
        let message = error.to_string();
        assert!(message.starts_with("bad.syn:1:"), "got: {message}");
        assert!(message.contains("'missing' is undefined"));
    }

    #[test]
    fn run_generator_writes_both_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("calc.syn");
        fs::write(&input, CALC).unwrap();

        let mut config = GeneratorConfig::new(&input);
        config.output_base = Some(dir.path().join("calc_parser"));
        run_generator(&config).expect("generates");

        let header = fs::read_to_string(dir.path().join("calc_parser.h")).unwrap();
        let implementation = fs::read_to_string(dir.path().join("calc_parser.cpp")).unwrap();

        assert!(header.contains("#ifndef CALC_PARSER_H_INCLUDED"));
        assert!(header.contains("enum Tokens"));
        assert!(header.contains("parse_Expr"));
        assert!(implementation.contains("g_states"));
        assert!(implementation.contains("action_0"));
    }

    #[test]
    fn failed_runs_write_no_output() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("bad.syn");
        fs::write(&input, "@A : missing ;").unwrap();

        let mut config = GeneratorConfig::new(&input);
        config.output_base = Some(dir.path().join("out"));
        assert!(run_generator(&config).is_err());
        assert!(!dir.path().join("out.h").exists());
        assert!(!dir.path().join("out.cpp").exists());
    }
}
