// tests/spec_compliance.rs
//
// Data-driven compliance suite. Each file under tests/compliance/ is a JSON
// array of documents of the form:
//
//   [{"given": <value>, "cases": [{"expression": "...", "result": <value>},
//                                 {"expression": "...", "error": "<category>"}]}]
//
// A case expects either a result value or an error category. Categories are
// the public error taxonomy: syntax, unknown-function, invalid-arity,
// invalid-type, invalid-value, undefined-variable, not-a-number.

use std::fs;
use std::path::Path;

use nutmeg_lang::{search, Error, Value};

fn error_matches(category: &str, e: &Error) -> bool {
    match category {
        "syntax" => matches!(e, Error::Syntax(_)),
        "unknown-function" => matches!(e, Error::UnknownFunction(_)),
        "invalid-arity" => matches!(e, Error::InvalidArity(_)),
        "invalid-type" => matches!(e, Error::InvalidType(_)),
        "invalid-value" => matches!(e, Error::InvalidValue(_)),
        "undefined-variable" => matches!(e, Error::UndefinedVariable(_)),
        "not-a-number" => matches!(e, Error::Infinity | Error::NotANumber),
        _ => false,
    }
}

fn run_file(path: &Path) -> (usize, usize) {
    let text = fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("error reading {}: {}", path.display(), e));

    let docs: serde_json::Value = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("error decoding {}: {}", path.display(), e));

    let name = path.file_name().unwrap().to_string_lossy().to_string();

    let mut total = 0;
    let mut pass = 0;

    for doc in docs.as_array().expect("top level must be an array") {
        let given = Value::from(doc["given"].clone());

        for case in doc["cases"].as_array().expect("cases must be an array") {
            total += 1;

            let expression = case["expression"]
                .as_str()
                .expect("expression must be a string");

            let result = search(expression, &given);

            if let Some(category) = case.get("error") {
                let category = category.as_str().expect("error must be a string");

                match result {
                    Ok(v) => panic!(
                        "expected {} error from expression {:?} in {}, got {:?}",
                        category, expression, name, v
                    ),
                    Err(e) => {
                        assert!(
                            error_matches(category, &e),
                            "incorrect error {:?} from expression {:?} in {}, expected {}",
                            e,
                            expression,
                            name,
                            category
                        );
                        pass += 1;
                    }
                }
            } else {
                let expected =
                    Value::from(case.get("result").cloned().unwrap_or(serde_json::Value::Null));

                match result {
                    Ok(v) => {
                        assert_eq!(
                            v, expected,
                            "incorrect result from expression {:?} in {}",
                            expression, name
                        );
                        pass += 1;
                    }
                    Err(e) => panic!(
                        "unexpected error {} from expression {:?} in {}",
                        e, expression, name
                    ),
                }
            }
        }
    }

    (total, pass)
}

#[test]
fn compliance_suite() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("compliance");

    let mut files = 0;
    let mut total = 0;
    let mut pass = 0;

    let mut entries: Vec<_> = fs::read_dir(&dir)
        .expect("error reading compliance test directory")
        .map(|e| e.expect("error reading directory entry").path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    entries.sort();

    for path in entries {
        let (t, p) = run_file(&path);
        files += 1;
        total += t;
        pass += p;
    }

    assert!(files > 0, "no compliance test files found");
    assert_eq!(pass, total);

    println!("{}/{} compliance cases passed across {} files", pass, total, files);
}
