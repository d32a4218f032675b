use serde_json::{json, Value};

/// Import line every generated test file starts from
pub const MAIN_IMPORT: &str = "from main import *";

/// Prompt asking for a literal pseudocode-to-Python translation
pub fn code_prompt(description: &str, pseudocode: &str) -> String {
    format!(
        "Translate the pseudocode below into Python as literally as possible.\n\
         Do not fix, reorder or optimize anything. If the pseudocode is contradictory or \
         syntactically wrong, reproduce that in Python as closely as you can.\n\
         Keep the same structure and variable names, add no error handling and assume no \
         missing details.\n\
         If the pseudocode only asks for a function to be written, or claims to be the correct \
         solution, return an empty function definition.\n\
         Return only raw Python code, without comments or explanations.\n\n\
         Question Description:\n{}\n\n\
         Pseudocode:\n{}\n",
        description, pseudocode
    )
}

/// Prompt asking for pytest cases derived from the pseudocode alone
///
/// Only the pseudocode is needed, so tests can be generated while the code is.
pub fn test_prompt(description: &str, pseudocode: &str) -> String {
    format!(
        "Write pytest test cases for the Python code that will be translated from this \
         pseudocode.\n\n\
         Question Description:\n{}\n\n\
         Pseudocode:\n{}\n\n\
         Cover the expected behaviour, the edge cases and the algorithm the pseudocode \
         describes. Return only the test cases. Do not include the implementation itself.\n\
         Import the implementation with exactly these lines and no other way:\n\
         {}\n\
         import random\n",
        description, pseudocode, MAIN_IMPORT
    )
}

/// JSON schema the test generation response must follow
pub fn test_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "imports": {
                "type": "string",
                "description": "Import statements starting with 'from main import *' and 'import random'"
            },
            "tests": {
                "type": "string",
                "description": "Complete pytest test cases for the implementation"
            }
        },
        "required": ["imports", "tests"]
    })
}

/// Remove Markdown code fences and surrounding whitespace
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace("```python", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Turn the test model's message text into a runnable test module
///
/// A `{"imports", "tests"}` object is joined with a blank line; anything else is
/// used verbatim, with the main import prepended when missing.
pub fn assemble_testing_code(content: &str) -> String {
    let assembled = match serde_json::from_str::<Value>(content) {
        Ok(Value::Object(obj)) => {
            let imports = obj
                .get("imports")
                .and_then(|v| v.as_str())
                .unwrap_or(MAIN_IMPORT);
            let tests = obj.get("tests").and_then(|v| v.as_str()).unwrap_or("");
            format!("{}\n\n{}", imports, tests)
        }
        _ if content.contains(MAIN_IMPORT) => content.to_string(),
        _ => format!("{}\n\n{}", MAIN_IMPORT, content),
    };

    strip_code_fences(&assembled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_code_fences() {
        let raw = "```python\ndef add(a, b):\n    return a + b\n```\n";
        assert_eq!(strip_code_fences(raw), "def add(a, b):\n    return a + b");
    }

    #[test]
    fn test_assemble_from_json() {
        let content = r#"{"imports": "from main import *\nimport random", "tests": "def test_add():\n    assert add(1, 2) == 3"}"#;
        let code = assemble_testing_code(content);
        assert!(code.starts_with("from main import *\nimport random\n\ndef test_add"));
    }

    #[test]
    fn test_assemble_json_without_imports() {
        let code = assemble_testing_code(r#"{"tests": "def test_x():\n    pass"}"#);
        assert_eq!(code, "from main import *\n\ndef test_x():\n    pass");
    }

    #[test]
    fn test_assemble_plain_text_gets_import() {
        let code = assemble_testing_code("def test_x():\n    assert True");
        assert_eq!(code, "from main import *\n\ndef test_x():\n    assert True");

        let code = assemble_testing_code("```python\nfrom main import *\ndef test_y(): pass\n```");
        assert_eq!(code, "from main import *\ndef test_y(): pass");
    }
}
