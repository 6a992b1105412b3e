//! Declarative reading of a JS framework config module.
//!
//! The config file is never executed. Only the object literal it exports
//! is read: `export default { .. }`, `export default defineNuxtConfig({ .. })`,
//! `module.exports = { .. }`, or an exported `const` bound to such a
//! literal. Values that are not plain literals (functions, identifiers,
//! template strings, calls) are skipped.

use std::path::Path;

use funcpack_core::BuildConfig;
use serde_json::{Map, Number, Value};

use crate::error::SourceError;

/// Read and parse the config at `path` into a [`BuildConfig`].
pub fn load_build_config(path: &Path) -> Result<BuildConfig, SourceError> {
    let source = std::fs::read_to_string(path).map_err(|e| SourceError::ConfigSyntax {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let value = parse_config(&source).map_err(|detail| SourceError::ConfigSyntax {
        path: path.to_path_buf(),
        detail,
    })?;
    Ok(BuildConfig::from_value(&value))
}

/// Extract the exported object literal as JSON.
pub fn parse_config(source: &str) -> Result<Value, String> {
    let code = strip_comments(source);
    let start = export_start(&code)
        .ok_or_else(|| "no `export default` or `module.exports` found".to_owned())?;

    let mut parser = Parser::new(&code, start);
    parser.skip_ws();
    parser.skip_wrapper_call();

    if parser.peek() == Some(b'{') {
        return parser.object();
    }

    let name = parser.identifier();
    if name.is_empty() {
        return Err(format!("exported value at byte {} is not an object literal", parser.pos));
    }
    let decl = find_declaration(&code, &name)
        .ok_or_else(|| format!("exported binding `{name}` is not declared in this file"))?;

    let mut parser = Parser::new(&code, decl);
    parser.skip_ws();
    parser.skip_wrapper_call();
    if parser.peek() != Some(b'{') {
        return Err(format!("`{name}` is not bound to an object literal"));
    }
    parser.object()
}

fn export_start(code: &str) -> Option<usize> {
    if let Some(i) = code.find("export default") {
        return Some(i + "export default".len());
    }
    let i = code.find("module.exports")?;
    let rest = &code[i + "module.exports".len()..];
    let eq = rest.find('=')?;
    rest[..eq]
        .trim()
        .is_empty()
        .then_some(i + "module.exports".len() + eq + 1)
}

/// Byte offset just after `=` in `const|let|var <name> [: Type] =`.
fn find_declaration(code: &str, name: &str) -> Option<usize> {
    code.match_indices(name).find_map(|(i, _)| {
        let before = code[..i].trim_end();
        let keyword = ["const", "let", "var"]
            .iter()
            .any(|k| before.ends_with(k) && i > before.len());
        if !keyword {
            return None;
        }
        let after = &code[i + name.len()..];
        let boundary = after
            .chars()
            .next()
            .is_none_or(|c| !(c.is_alphanumeric() || c == '_' || c == '$'));
        if !boundary {
            return None;
        }
        let eq = after.find('=')?;
        let between = after[..eq].trim();
        if !(between.is_empty() || between.starts_with(':')) || after[eq + 1..].starts_with('=') {
            return None;
        }
        Some(i + name.len() + eq + 1)
    })
}

/// Remove `//` and `/* */` comments, keeping string contents intact.
fn strip_comments(source: &str) -> String {
    let bytes = source.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            out.push(b);
            if b == b'\\' && i + 1 < bytes.len() {
                out.push(bytes[i + 1]);
                i += 2;
                continue;
            }
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        match (b, bytes.get(i + 1)) {
            (b'"' | b'\'' | b'`', _) => {
                quote = Some(b);
                out.push(b);
                i += 1;
            }
            (b'/', Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    i += 1;
                }
            }
            (b'/', Some(b'*')) => {
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    i += 1;
                }
                i += 2;
                out.push(b' ');
            }
            _ => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

struct Parser<'s> {
    src: &'s [u8],
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(code: &'s str, pos: usize) -> Self {
        Self {
            src: code.as_bytes(),
            pos,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8) -> Result<(), String> {
        self.skip_ws();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(format!(
                "expected `{}` at byte {}",
                char::from(byte),
                self.pos
            ))
        }
    }

    /// `defineNuxtConfig(` and similar single-argument wrappers.
    fn skip_wrapper_call(&mut self) {
        let save = self.pos;
        let name = self.identifier();
        self.skip_ws();
        if !name.is_empty() && self.peek() == Some(b'(') {
            self.pos += 1;
            self.skip_ws();
        } else {
            self.pos = save;
        }
    }

    fn identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'$')
        {
            self.pos += 1;
        }
        String::from_utf8_lossy(&self.src[start..self.pos]).into_owned()
    }

    fn object(&mut self) -> Result<Value, String> {
        self.expect(b'{')?;
        let mut map = Map::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b'}') => {
                    self.pos += 1;
                    return Ok(Value::Object(map));
                }
                Some(b',') => {
                    self.pos += 1;
                    continue;
                }
                Some(b']') => return Err(format!("unexpected `]` at byte {}", self.pos)),
                None => return Err("unterminated object literal".to_owned()),
                _ => {}
            }

            let key = match self.peek() {
                Some(q @ (b'"' | b'\'')) => self.string(q)?,
                Some(b'[' | b'.') => {
                    // computed key or spread
                    self.skip_expression();
                    continue;
                }
                _ => self.identifier(),
            };
            if key.is_empty() {
                self.skip_expression();
                continue;
            }

            self.skip_ws();
            if self.peek() != Some(b':') {
                // shorthand property or method
                self.skip_expression();
                continue;
            }
            self.pos += 1;
            if let Some(value) = self.value()? {
                map.insert(key, value);
            }
        }
    }

    fn array(&mut self) -> Result<Value, String> {
        self.expect(b'[')?;
        let mut items = Vec::new();
        loop {
            self.skip_ws();
            match self.peek() {
                Some(b']') => {
                    self.pos += 1;
                    return Ok(Value::Array(items));
                }
                Some(b',') => self.pos += 1,
                Some(b'}') => return Err(format!("unexpected `}}` at byte {}", self.pos)),
                None => return Err("unterminated array literal".to_owned()),
                _ => {
                    if let Some(value) = self.value()? {
                        items.push(value);
                    }
                }
            }
        }
    }

    /// One value; `None` for anything that is not a plain literal.
    fn value(&mut self) -> Result<Option<Value>, String> {
        self.skip_ws();
        let value = match self.peek() {
            Some(b'{') => Some(self.object()?),
            Some(b'[') => Some(self.array()?),
            Some(q @ (b'"' | b'\'')) => Some(Value::String(self.string(q)?)),
            Some(b) if b.is_ascii_digit() || b == b'-' || b == b'.' => self.number(),
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => {
                let save = self.pos;
                let word = self.identifier();
                self.skip_ws();
                let terminal = matches!(self.peek(), Some(b',' | b'}' | b']') | None);
                match word.as_str() {
                    "true" if terminal => Some(Value::Bool(true)),
                    "false" if terminal => Some(Value::Bool(false)),
                    "null" if terminal => Some(Value::Null),
                    _ => {
                        self.pos = save;
                        self.skip_expression();
                        None
                    }
                }
            }
            _ => {
                self.skip_expression();
                None
            }
        };
        Ok(value)
    }

    fn number(&mut self) -> Option<Value> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'+' | b'_'))
        {
            self.pos += 1;
        }
        let text = String::from_utf8_lossy(&self.src[start..self.pos]).replace('_', "");
        if let Ok(int) = text.parse::<i64>() {
            return Some(Value::Number(int.into()));
        }
        match text.parse::<f64>() {
            Ok(float) => Number::from_f64(float).map(Value::Number),
            Err(_) => {
                self.pos = start;
                self.skip_expression();
                None
            }
        }
    }

    fn string(&mut self, quote: u8) -> Result<String, String> {
        let start = self.pos;
        self.pos += 1;
        let mut out: Vec<u8> = Vec::new();
        loop {
            let Some(b) = self.peek() else {
                return Err(format!("unterminated string starting at byte {start}"));
            };
            self.pos += 1;
            match b {
                b'\\' => {
                    let Some(esc) = self.peek() else { continue };
                    self.pos += 1;
                    match esc {
                        b'n' => out.push(b'\n'),
                        b't' => out.push(b'\t'),
                        b'r' => out.push(b'\r'),
                        b'u' => {
                            let hex = self.src.get(self.pos..self.pos + 4).unwrap_or_default();
                            let decoded = std::str::from_utf8(hex)
                                // arch-lint: allow(no-silent-result-drop) reason="a malformed unicode escape is kept literally"
                                .ok()
                                // arch-lint: allow(no-silent-result-drop) reason="a malformed unicode escape is kept literally"
                                .and_then(|h| u32::from_str_radix(h, 16).ok())
                                .and_then(char::from_u32);
                            if let Some(c) = decoded {
                                let mut buf = [0u8; 4];
                                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                                self.pos += 4;
                            } else {
                                out.push(b'u');
                            }
                        }
                        other => out.push(other),
                    }
                }
                b if b == quote => break,
                b => out.push(b),
            }
        }
        Ok(String::from_utf8_lossy(&out).into_owned())
    }

    /// Skip to the next `,` `}` or `]` at nesting depth zero.
    fn skip_expression(&mut self) {
        let mut depth = 0usize;
        while let Some(b) = self.peek() {
            match b {
                b'"' | b'\'' | b'`' => {
                    self.skip_quoted(b);
                    continue;
                }
                b'(' | b'{' | b'[' => depth += 1,
                b')' | b'}' | b']' if depth > 0 => depth -= 1,
                b'}' | b']' => return,
                b',' if depth == 0 => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn skip_quoted(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(b) = self.peek() {
            self.pos += 1;
            if b == b'\\' {
                self.pos += 1;
            } else if b == quote {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn export_default_object() {
        let value = parse_config("export default { dir:{static:'pub'} }").unwrap();
        assert_eq!(value, json!({ "dir": { "static": "pub" } }));
    }

    #[test]
    fn module_exports_with_comments_and_trailing_commas() {
        let src = r#"
            // site config
            module.exports = {
              /* where fingerprinted assets live */
              build: { publicPath: "/assets/", },
              "buildDir": '.out', // custom
              lambdaNames: ['index', "admin",],
              ssr: true,
              port: 3000,
              ratio: 1.5,
              target: null,
            }
        "#;
        let value = parse_config(src).unwrap();
        assert_eq!(value["build"]["publicPath"], "/assets/");
        assert_eq!(value["buildDir"], ".out");
        assert_eq!(value["lambdaNames"], json!(["index", "admin"]));
        assert_eq!(value["ssr"], true);
        assert_eq!(value["port"], 3000);
        assert_eq!(value["ratio"], 1.5);
        assert_eq!(value["target"], Value::Null);
    }

    #[test]
    fn non_literal_values_are_skipped() {
        let src = r#"
            import path from 'path'
            export default {
              srcDir: path.resolve(__dirname, 'src'),
              head: { title: `site ${name}` },
              build: {
                extend(config, { isDev }) { if (isDev) { config.x = [1, 2] } },
                publicPath: '/_custom/',
                loaders: { vue: { test: () => ({ a: 1 }) } },
              },
              mode,
              ...shared,
              dir: { static: 'public' },
            }
        "#;
        let value = parse_config(src).unwrap();
        assert!(value.get("srcDir").is_none());
        assert!(value["head"].get("title").is_none());
        assert_eq!(value["build"]["publicPath"], "/_custom/");
        assert_eq!(value["dir"]["static"], "public");
        assert!(value.get("mode").is_none());
    }

    #[test]
    fn define_config_wrapper_and_named_binding() {
        let wrapped = parse_config("export default defineNuxtConfig({ buildDir: '.b' })").unwrap();
        assert_eq!(wrapped["buildDir"], ".b");

        let bound = parse_config(
            "const config: NuxtConfig = { dir: { static: 's' } }\nexport default config\n",
        )
        .unwrap();
        assert_eq!(bound["dir"]["static"], "s");
    }

    #[test]
    fn strings_keep_comment_markers() {
        let value = parse_config(r#"export default { url: "http://x/*y*/", esc: 'it\'s A' }"#)
            .unwrap();
        assert_eq!(value["url"], "http://x/*y*/");
        assert_eq!(value["esc"], "it's A");
    }

    #[test]
    fn missing_export_is_an_error() {
        assert!(parse_config("const x = { a: 1 }").is_err());
        assert!(parse_config("export default config").is_err());
        assert!(parse_config("export default { a: 'unterminated }").is_err());
    }

    #[test]
    fn load_build_config_reads_fields() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("nuxt.config.js");
        std::fs::write(&path, "export default { dir: { static: 'pub' }, lambdaName: 'app' }").unwrap();

        let config = load_build_config(&path).unwrap();
        assert_eq!(config.static_dir, "pub");
        assert_eq!(config.entry_points, vec!["app"]);
        assert_eq!(config.public_path, "/_nuxt/");
    }
}
