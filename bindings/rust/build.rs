use std::{env, error::Error, fs, path::PathBuf};

const GRAMMAR_NAME: &str = "rad";

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let grammar_path = manifest_dir.join("src").join("grammar.json");
    println!("cargo:rerun-if-changed={}", grammar_path.display());

    // parser.c is generated from grammar.json; the only header it includes is
    // written next to it.
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);
    let src_dir = out_dir.join("src");
    fs::create_dir_all(src_dir.join("tree_sitter"))?;

    let grammar_json = fs::read_to_string(&grammar_path)?;
    let version = (
        env::var("CARGO_PKG_VERSION_MAJOR")?.parse::<u8>()?,
        env::var("CARGO_PKG_VERSION_MINOR")?.parse::<u8>()?,
        env::var("CARGO_PKG_VERSION_PATCH")?.parse::<u8>()?,
    );
    let (name, parser_c) =
        tree_sitter_generate::generate_parser_for_grammar(&grammar_json, Some(version))?;
    if name != GRAMMAR_NAME {
        return Err(format!("grammar.json declares `{name}`, expected `{GRAMMAR_NAME}`").into());
    }

    let parser_path = src_dir.join("parser.c");
    fs::write(&parser_path, parser_c)?;
    fs::write(
        src_dir.join("tree_sitter").join("parser.h"),
        tree_sitter::PARSER_HEADER,
    )?;

    // The external scanner lives in bindings/rust/scanner.rs and is linked
    // through its exported `tree_sitter_rad_external_scanner_*` symbols.
    let mut c_config = cc::Build::new();
    c_config
        .std("c11")
        .include(&src_dir)
        .warnings(false)
        .flag_if_supported("-Wno-unused-parameter")
        .flag_if_supported("-Wno-unused-but-set-variable")
        .flag_if_supported("-Wno-trigraphs");

    #[cfg(target_env = "msvc")]
    c_config.flag("-utf-8");

    c_config.file(&parser_path);
    c_config.compile("tree-sitter-rad");

    Ok(())
}
