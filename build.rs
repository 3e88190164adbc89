use std::io::Write;
use std::path::PathBuf;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // For each .bin file in our tests/data directory, create one test function
    // that parses that report descriptor and checks it survives a round trip
    // through the byte and the human-readable form.
    let datadir: PathBuf = [concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data")]
        .iter()
        .collect();
    println!("cargo:rerun-if-changed={}", datadir.display());

    let out_dir = std::env::var_os("OUT_DIR").ok_or("OUT_DIR is not set")?;
    let dest_path = PathBuf::from(&out_dir).join("test-report-descriptors.rs");
    let mut file = std::fs::File::create(dest_path)?;

    writeln!(file, "use hidrdesc::*;")?;
    writeln!(file)?;

    // The packaged crate ships without test data
    let mut entries: Vec<_> = match std::fs::read_dir(&datadir) {
        Ok(dir) => dir
            .flatten()
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "bin"))
            .collect(),
        Err(_) => vec![],
    };
    entries.sort_by_key(|e| e.file_name());

    for rdesc in entries {
        let filename = rdesc.file_name().to_string_lossy().to_string();
        let funcname = filename.replace([':', '.', '-'], "_");
        let path = rdesc.path();
        writeln!(
            file,
            "
#[test]
#[allow(non_snake_case)]
fn test_{funcname}() {{
    let bytes: Vec<u8> = std::fs::read({path:?}).unwrap();
    let rdesc = ReportDescriptor::try_from(bytes.as_slice())
        .unwrap_or_else(|e| panic!(\"Failed to parse {filename}: {{e}}\"));

    // a trailing zero byte is dropped
    let serialized = rdesc.bytes();
    assert_eq!(serialized.len(), rdesc.size());
    assert!(bytes.starts_with(&serialized));
    assert!(bytes.len() - serialized.len() <= 1);

    let names = usages::NoUsageNames;
    let text = rdesc.to_human(&names);
    let reparsed = ReportDescriptor::from_human_descr(&text, &names)
        .unwrap_or_else(|e| panic!(\"Failed to parse {filename} text: {{e}}\"));
    assert_eq!(reparsed.items().len(), rdesc.items().len());
    for (a, b) in rdesc.items().iter().zip(reparsed.items()) {{
        assert_eq!((a.tag(), a.value()), (b.tag(), b.value()), \"item at offset {{}}\", a.offset());
    }}
}}
"
        )?;
    }

    Ok(())
}
