//! Required-module discovery
//!
//! The publisher only needs two things from a configuration script: the
//! modules it imports with `Import-DscResource`, and whether the text is
//! well-formed. [`DscScriptParser`] is a token-level scanner that answers
//! both without implementing the full PowerShell grammar. Callers depend on
//! the [`ModuleDependencyParser`] trait so a real language parser can be
//! plugged in instead.

use crate::core::error::Diagnostic;

/// Modules shipped with every DSC node; never copied into archives
pub const BUILTIN_MODULES: &[&str] = &["PSDesiredStateConfiguration"];

/// A module imported by the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredModule {
    pub name: String,
    /// Requested version (`-ModuleVersion` or a module specification)
    pub version: Option<String>,
}

impl RequiredModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: Some(version.into()),
        }
    }
}

/// Result of scanning a configuration source
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Required modules in discovery order, duplicates included
    pub modules: Vec<RequiredModule>,
    /// Names of the `Configuration` blocks found
    pub configurations: Vec<String>,
    pub errors: Vec<Diagnostic>,
}

impl ParseOutcome {
    pub fn module_names(&self) -> Vec<String> {
        self.modules.iter().map(|m| m.name.clone()).collect()
    }
}

/// Extracts required module names from configuration text
pub trait ModuleDependencyParser: Send + Sync {
    fn parse(&self, text: &str) -> ParseOutcome;
}

/// Scanner for PowerShell DSC configuration scripts
#[derive(Debug, Clone)]
pub struct DscScriptParser {
    builtin_modules: Vec<String>,
}

impl Default for DscScriptParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DscScriptParser {
    pub fn new() -> Self {
        Self {
            builtin_modules: BUILTIN_MODULES.iter().map(|m| m.to_string()).collect(),
        }
    }

    fn is_builtin(&self, name: &str) -> bool {
        self.builtin_modules
            .iter()
            .any(|b| b.eq_ignore_ascii_case(name))
    }
}

impl ModuleDependencyParser for DscScriptParser {
    fn parse(&self, text: &str) -> ParseOutcome {
        let (tokens, mut errors) = Lexer::new(text).run();
        let mut analysis = Analyzer::new(&tokens);
        analysis.run();
        errors.append(&mut analysis.errors);
        errors.sort_by_key(|d| (d.line, d.column));

        let modules = analysis
            .modules
            .into_iter()
            .filter(|m| !self.is_builtin(&m.name))
            .collect();

        ParseOutcome {
            modules,
            configurations: analysis.configurations,
            errors,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Word(String),
    Str(String),
    Open(char),
    Close(char),
    Comma,
    /// Newline or `;`
    End,
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    line: usize,
    column: usize,
}

fn diagnostic(line: usize, column: usize, message: impl Into<String>) -> Diagnostic {
    Diagnostic {
        line,
        column,
        message: message.into(),
    }
}

fn closing_for(open: char) -> char {
    match open {
        '{' => '}',
        '(' => ')',
        _ => ']',
    }
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    errors: Vec<Diagnostic>,
    /// Open delimiters with their positions
    stack: Vec<(char, usize, usize)>,
}

impl Lexer {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            errors: Vec::new(),
            stack: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn run(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while let Some(c) = self.peek() {
            let (line, column) = (self.line, self.column);
            match c {
                '\n' | ';' => {
                    self.bump();
                    self.push(TokenKind::End, line, column);
                }
                c if c.is_whitespace() => {
                    self.bump();
                }
                '`' if matches!(self.peek_at(1), Some('\n') | Some('\r')) => {
                    // Line continuation.
                    self.bump();
                    if self.peek() == Some('\r') {
                        self.bump();
                    }
                    if self.peek() == Some('\n') {
                        self.bump();
                    }
                }
                '<' if self.peek_at(1) == Some('#') => self.block_comment(),
                '#' => self.line_comment(),
                '@' if matches!(self.peek_at(1), Some('\'') | Some('"'))
                    && self.here_string_opens() =>
                {
                    self.here_string();
                }
                '\'' => self.single_quoted(),
                '"' => self.double_quoted(),
                '{' | '(' | '[' => {
                    self.bump();
                    self.stack.push((c, line, column));
                    self.push(TokenKind::Open(c), line, column);
                }
                '}' | ')' | ']' => {
                    self.bump();
                    self.close(c, line, column);
                    self.push(TokenKind::Close(c), line, column);
                }
                ',' => {
                    self.bump();
                    self.push(TokenKind::Comma, line, column);
                }
                _ => self.word(),
            }
        }

        while let Some((open, line, column)) = self.stack.pop() {
            self.errors.push(diagnostic(
                line,
                column,
                format!("missing closing '{}' for '{}'", closing_for(open), open),
            ));
        }

        (self.tokens, self.errors)
    }

    fn close(&mut self, close: char, line: usize, column: usize) {
        match self.stack.last().copied() {
            Some((open, _, _)) if closing_for(open) == close => {
                self.stack.pop();
            }
            Some((open, open_line, open_column)) => {
                self.errors.push(diagnostic(
                    line,
                    column,
                    format!(
                        "unexpected '{}'; '{}' opened at {}:{} is still open",
                        close, open, open_line, open_column
                    ),
                ));
                // Recover when the closer matches something further down.
                if let Some(idx) = self
                    .stack
                    .iter()
                    .rposition(|(o, _, _)| closing_for(*o) == close)
                {
                    self.stack.truncate(idx);
                }
            }
            None => {
                self.errors
                    .push(diagnostic(line, column, format!("unexpected '{}'", close)));
            }
        }
    }

    fn line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn block_comment(&mut self) {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.bump();
        loop {
            match self.bump() {
                Some('#') if self.peek() == Some('>') => {
                    self.bump();
                    return;
                }
                Some(_) => {}
                None => {
                    self.errors
                        .push(diagnostic(line, column, "unterminated block comment"));
                    return;
                }
            }
        }
    }

    /// `@'` or `@"` followed only by whitespace up to the end of the line
    fn here_string_opens(&self) -> bool {
        let mut offset = 2;
        while let Some(c) = self.peek_at(offset) {
            match c {
                '\n' => return true,
                c if c.is_whitespace() => offset += 1,
                _ => return false,
            }
        }
        false
    }

    fn here_string(&mut self) {
        let (line, column) = (self.line, self.column);
        self.bump();
        let quote = self.bump().unwrap_or('"');
        while let Some(c) = self.bump() {
            if c == '\n' {
                break;
            }
        }

        let mut content = String::new();
        let mut at_line_start = true;
        while let Some(c) = self.peek() {
            if at_line_start && c == quote && self.peek_at(1) == Some('@') {
                self.bump();
                self.bump();
                if content.ends_with('\n') {
                    content.pop();
                }
                self.push(TokenKind::Str(content), line, column);
                return;
            }
            self.bump();
            at_line_start = c == '\n';
            content.push(c);
        }

        self.errors
            .push(diagnostic(line, column, "unterminated here-string"));
    }

    fn single_quoted(&mut self) {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut content = String::new();
        loop {
            match self.bump() {
                Some('\'') if self.peek() == Some('\'') => {
                    self.bump();
                    content.push('\'');
                }
                Some('\'') => {
                    self.push(TokenKind::Str(content), line, column);
                    return;
                }
                Some(c) => content.push(c),
                None => {
                    self.errors
                        .push(diagnostic(line, column, "unterminated string"));
                    return;
                }
            }
        }
    }

    fn double_quoted(&mut self) {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut content = String::new();
        loop {
            match self.bump() {
                Some('`') => {
                    if let Some(escaped) = self.bump() {
                        content.push(escaped);
                    }
                }
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                    content.push('"');
                }
                Some('"') => {
                    self.push(TokenKind::Str(content), line, column);
                    return;
                }
                Some(c) => content.push(c),
                None => {
                    self.errors
                        .push(diagnostic(line, column, "unterminated string"));
                    return;
                }
            }
        }
    }

    fn word(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut word = String::new();
        while let Some(c) = self.peek() {
            if c.is_whitespace() || "{}()[],;'\"#".contains(c) {
                break;
            }
            self.bump();
            word.push(c);
        }
        if word.is_empty() {
            // Unreachable for well-formed input; consume to guarantee progress.
            self.bump();
            return;
        }
        self.push(TokenKind::Word(word), line, column);
    }
}

struct Analyzer<'a> {
    tokens: &'a [Token],
    pos: usize,
    modules: Vec<RequiredModule>,
    configurations: Vec<String>,
    errors: Vec<Diagnostic>,
}

impl<'a> Analyzer<'a> {
    fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            modules: Vec::new(),
            configurations: Vec::new(),
            errors: Vec::new(),
        }
    }

    fn at_statement_start(&self) -> bool {
        match self.pos.checked_sub(1).and_then(|i| self.tokens.get(i)) {
            None => true,
            Some(prev) => matches!(
                prev.kind,
                TokenKind::End | TokenKind::Open('{') | TokenKind::Close('}')
            ),
        }
    }

    /// Next token is `=`, as for a hashtable key such as `Configuration = 'Web'`
    fn followed_by_assignment(&self) -> bool {
        matches!(
            self.tokens.get(self.pos + 1).map(|t| &t.kind),
            Some(TokenKind::Word(w)) if w.starts_with('=')
        )
    }

    fn run(&mut self) {
        let tokens = self.tokens;
        while self.pos < tokens.len() {
            let token = &tokens[self.pos];
            match &token.kind {
                TokenKind::Word(w) if w.eq_ignore_ascii_case("Import-DscResource") => {
                    self.pos += 1;
                    self.import_statement(token.line, token.column);
                }
                TokenKind::Word(w)
                    if w.eq_ignore_ascii_case("Configuration")
                        && self.at_statement_start()
                        && !self.followed_by_assignment() =>
                {
                    self.pos += 1;
                    self.configuration(token.line, token.column);
                }
                _ => self.pos += 1,
            }
        }
    }

    fn skip_ends(&mut self) {
        while matches!(self.tokens.get(self.pos).map(|t| &t.kind), Some(TokenKind::End)) {
            self.pos += 1;
        }
    }

    fn configuration(&mut self, line: usize, column: usize) {
        let name = match self.tokens.get(self.pos).map(|t| &t.kind) {
            Some(TokenKind::Word(name)) | Some(TokenKind::Str(name)) => {
                let name = name.clone();
                self.pos += 1;
                name
            }
            _ => {
                self.errors.push(diagnostic(
                    line,
                    column,
                    "'Configuration' must be followed by a name",
                ));
                return;
            }
        };

        self.skip_ends();
        match self.tokens.get(self.pos).map(|t| &t.kind) {
            Some(TokenKind::Open('{')) => self.configurations.push(name),
            _ => self.errors.push(diagnostic(
                line,
                column,
                format!("configuration '{}' is missing its '{{' body", name),
            )),
        }
    }

    /// Collect tokens up to the end of the statement, keeping nested groups
    fn statement_tokens(&mut self) -> Vec<Token> {
        let mut depth = 0usize;
        let mut collected = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::End if depth == 0 => break,
                TokenKind::Close(_) if depth == 0 => break,
                TokenKind::Open(_) => depth += 1,
                TokenKind::Close(_) => depth -= 1,
                _ => {}
            }
            collected.push(token.clone());
            self.pos += 1;
        }
        collected
    }

    fn import_statement(&mut self, line: usize, column: usize) {
        let tokens = self.statement_tokens();
        let mut names: Vec<RequiredModule> = Vec::new();
        let mut version: Option<String> = None;
        let mut saw_module_param = false;

        let mut i = 0;
        while i < tokens.len() {
            // `-Name:Value` binds the first value to the parameter word.
            let (param, bound) = match &tokens[i].kind {
                TokenKind::Word(w) if w.starts_with('-') => {
                    let w = w.trim_start_matches('-');
                    match w.split_once(':') {
                        Some((name, value)) => (
                            name.to_ascii_lowercase(),
                            Some(value.to_string()).filter(|v| !v.is_empty() && v != "@"),
                        ),
                        None => (w.to_ascii_lowercase(), None),
                    }
                }
                _ => {
                    i += 1;
                    continue;
                }
            };
            i += 1;
            let (values, specs, next) = match bound {
                Some(value) if matches!(tokens.get(i).map(|t| &t.kind), Some(TokenKind::Comma)) => {
                    let (mut values, specs, next) = parameter_values(&tokens, i + 1);
                    values.insert(0, value);
                    (values, specs, next)
                }
                Some(value) => (vec![value], Vec::new(), i),
                None => parameter_values(&tokens, i),
            };
            i = next;

            match param.as_str() {
                "modulename" | "module" => {
                    saw_module_param = true;
                    if values.is_empty() && specs.is_empty() {
                        self.errors.push(diagnostic(
                            line,
                            column,
                            "Import-DscResource -ModuleName requires a value",
                        ));
                    }
                    names.extend(values.into_iter().map(RequiredModule::new));
                    names.extend(specs);
                }
                "moduleversion" => {
                    if values.is_empty() {
                        self.errors.push(diagnostic(
                            line,
                            column,
                            "Import-DscResource -ModuleVersion requires a value",
                        ));
                    }
                    version = values.into_iter().next();
                }
                _ => {}
            }
        }

        if let Some(version) = version {
            match names.as_mut_slice() {
                [single] if single.version.is_none() => single.version = Some(version),
                _ if saw_module_param => self.errors.push(diagnostic(
                    line,
                    column,
                    "-ModuleVersion can only be used with a single -ModuleName",
                )),
                _ => {}
            }
        }

        self.modules.extend(names);
    }
}

/// Read the value list after a parameter starting at `start`
///
/// Returns plain names, module specifications from `@{...}` hashtables, and
/// the index of the first token after the values.
fn parameter_values(tokens: &[Token], start: usize) -> (Vec<String>, Vec<RequiredModule>, usize) {
    let mut values = Vec::new();
    let mut specs = Vec::new();
    let mut i = start;

    loop {
        match tokens.get(i).map(|t| &t.kind) {
            Some(TokenKind::Word(w)) if w == "@" => {
                i += 1;
                continue;
            }
            Some(TokenKind::Word(w)) if !w.starts_with('-') => {
                values.push(w.clone());
                i += 1;
            }
            Some(TokenKind::Str(s)) => {
                values.push(s.clone());
                i += 1;
            }
            Some(TokenKind::Open('(')) => {
                let end = group_end(tokens, i);
                let inner: Vec<Token> = tokens[i + 1..end]
                    .iter()
                    .filter(|t| t.kind != TokenKind::End)
                    .cloned()
                    .collect();
                let (inner_values, inner_specs, _) = parameter_values(&inner, 0);
                values.extend(inner_values);
                specs.extend(inner_specs);
                i = end + 1;
            }
            Some(TokenKind::Open('{')) => {
                let end = group_end(tokens, i);
                if let Some(spec) = module_specification(&tokens[i + 1..end]) {
                    specs.push(spec);
                }
                i = end + 1;
            }
            _ => break,
        }

        // Values continue only across commas.
        match tokens.get(i).map(|t| &t.kind) {
            Some(TokenKind::Comma) => i += 1,
            _ => break,
        }
    }

    (values, specs, i)
}

/// Index of the token closing the group opened at `open_idx`, or the
/// token count when the group is never closed
fn group_end(tokens: &[Token], open_idx: usize) -> usize {
    let mut depth = 0usize;
    for (idx, token) in tokens.iter().enumerate().skip(open_idx) {
        match token.kind {
            TokenKind::Open(_) => depth += 1,
            TokenKind::Close(_) => {
                depth -= 1;
                if depth == 0 {
                    return idx;
                }
            }
            _ => {}
        }
    }
    tokens.len()
}

/// Read `ModuleName = 'x'; ModuleVersion = '1.0'` from hashtable tokens
fn module_specification(tokens: &[Token]) -> Option<RequiredModule> {
    let mut name = None;
    let mut version = None;
    let mut key: Option<String> = None;

    for token in tokens {
        match &token.kind {
            TokenKind::Word(w) if w == "=" => {}
            TokenKind::Word(w) if key.is_none() => {
                let (k, inline_value) = match w.split_once('=') {
                    Some((k, v)) => (k, Some(v)),
                    None => (w.as_str(), None),
                };
                let k = k.trim().to_ascii_lowercase();
                match inline_value.filter(|v| !v.is_empty()) {
                    Some(v) => assign(&k, v.to_string(), &mut name, &mut version),
                    None => key = Some(k),
                }
            }
            TokenKind::Word(v) | TokenKind::Str(v) => {
                if let Some(k) = key.take() {
                    assign(&k, v.trim_start_matches('=').to_string(), &mut name, &mut version);
                }
            }
            TokenKind::End => key = None,
            _ => {}
        }
    }

    name.map(|name| RequiredModule { name, version })
}

fn assign(key: &str, value: String, name: &mut Option<String>, version: &mut Option<String>) {
    match key {
        "modulename" => *name = Some(value),
        "moduleversion" | "requiredversion" => *version = Some(value),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> ParseOutcome {
        DscScriptParser::new().parse(text)
    }

    #[test]
    fn test_single_module() {
        let outcome = parse(
            r#"
Configuration Site {
    Import-DscResource -ModuleName ModuleA
    Node localhost {
        WebSite Default { Name = 'Default Web Site' }
    }
}
"#,
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.module_names(), vec!["ModuleA"]);
        assert_eq!(outcome.configurations, vec!["Site"]);
    }

    #[test]
    fn test_module_list_and_quotes() {
        let outcome = parse(
            "Configuration C {\n  Import-DscResource -ModuleName 'xWebAdministration', \"xNetworking\",ModuleC\n}\n",
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(
            outcome.module_names(),
            vec!["xWebAdministration", "xNetworking", "ModuleC"]
        );
    }

    #[test]
    fn test_builtin_module_is_excluded() {
        let outcome = parse(
            "Configuration C {\n  Import-DscResource -ModuleName PSDesiredStateConfiguration\n  Import-DscResource -Module ModuleA\n}\n",
        );

        assert_eq!(outcome.module_names(), vec!["ModuleA"]);
    }

    #[test]
    fn test_module_version() {
        let outcome = parse(
            "Configuration C {\n  Import-DscResource -ModuleName ModuleA -ModuleVersion 1.2.0\n}\n",
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.modules, vec![RequiredModule::with_version("ModuleA", "1.2.0")]);
    }

    #[test]
    fn test_module_specification_hashtable() {
        let outcome = parse(
            "Configuration C {\n  Import-DscResource -ModuleName @{ModuleName='ModuleA'; ModuleVersion='2.0'}\n}\n",
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.modules, vec![RequiredModule::with_version("ModuleA", "2.0")]);
    }

    #[test]
    fn test_array_syntax_across_lines() {
        let outcome = parse(
            "Configuration C {\n  Import-DscResource -ModuleName @(\n    'ModuleA',\n    'ModuleB'\n  )\n}\n",
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.module_names(), vec!["ModuleA", "ModuleB"]);
    }

    #[test]
    fn test_duplicates_are_preserved_in_order() {
        let outcome = parse(
            "Configuration A {\n  Import-DscResource -ModuleName ModuleA\n}\nConfiguration B {\n  Import-DscResource -ModuleName ModuleB, ModuleA\n}\n",
        );

        assert_eq!(outcome.module_names(), vec!["ModuleA", "ModuleB", "ModuleA"]);
        assert_eq!(outcome.configurations, vec!["A", "B"]);
    }

    #[test]
    fn test_line_continuation() {
        let outcome = parse(
            "Configuration C {\n  Import-DscResource `\n    -ModuleName ModuleA\n}\n",
        );

        assert_eq!(outcome.module_names(), vec!["ModuleA"]);
    }

    #[test]
    fn test_comments_and_strings_are_ignored() {
        let outcome = parse(
            r#"
# Import-DscResource -ModuleName Commented
<#
  Import-DscResource -ModuleName BlockCommented {
#>
Configuration C {
    $text = "Import-DscResource -ModuleName InString }"
    $here = @'
Import-DscResource -ModuleName InHereString
}
'@
    Import-DscResource -ModuleName Real
}
"#,
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.module_names(), vec!["Real"]);
    }

    #[test]
    fn test_unclosed_brace_is_reported() {
        let outcome = parse("Configuration C {\n  Import-DscResource -ModuleName ModuleA\n");

        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].line, 1);
        assert!(outcome.errors[0].message.contains("missing closing '}'"));
    }

    #[test]
    fn test_all_diagnostics_are_collected() {
        let outcome = parse("Configuration C {\n  $a = 'unterminated\n}\n)\n");

        // The unterminated string swallows the rest; the brace stays open.
        assert!(outcome.errors.len() >= 2, "{:?}", outcome.errors);
        assert!(outcome.errors.iter().any(|d| d.message.contains("unterminated string")));
        assert!(outcome.errors.iter().any(|d| d.message.contains("missing closing")));
    }

    #[test]
    fn test_mismatched_closer() {
        let outcome = parse("Configuration C {\n  Node x (\n  }\n");

        assert!(!outcome.errors.is_empty());
        assert!(outcome.errors[0].message.contains("unexpected '}'"));
    }

    #[test]
    fn test_configuration_without_body() {
        let outcome = parse("Configuration Broken\n$x = 1\n");

        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("missing its '{' body"));
    }

    #[test]
    fn test_module_name_without_value() {
        let outcome = parse("Configuration C {\n  Import-DscResource -ModuleName\n}\n");

        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].message.contains("requires a value"));
    }

    #[test]
    fn test_configuration_data_key_is_not_a_declaration() {
        let outcome = parse(
            r#"
$ConfigData = @{ AllNodes = @( @{ NodeName = 'localhost'; Configuration = 'Web' } ) }
$Other = @{
    Configuration = 'Db'
}
Configuration Site {
    Import-DscResource -ModuleName ModuleA
}
"#,
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(outcome.configurations, vec!["Site"]);
        assert_eq!(outcome.module_names(), vec!["ModuleA"]);
    }

    #[test]
    fn test_colon_bound_parameters() {
        let outcome = parse(
            "Configuration C {\n  Import-DscResource -ModuleName:ModuleA\n  Import-DscResource -ModuleName:ModuleB -ModuleVersion:2.1\n  Import-DscResource -Module:ModuleC, ModuleD\n  Import-DscResource -ModuleName: 'ModuleE'\n}\n",
        );

        assert!(outcome.errors.is_empty(), "{:?}", outcome.errors);
        assert_eq!(
            outcome.module_names(),
            vec!["ModuleA", "ModuleB", "ModuleC", "ModuleD", "ModuleE"]
        );
        assert_eq!(outcome.modules[1].version.as_deref(), Some("2.1"));
    }

    #[test]
    fn test_name_only_import_contributes_nothing() {
        let outcome = parse("Configuration C {\n  Import-DscResource -Name File\n}\n");

        assert!(outcome.errors.is_empty());
        assert!(outcome.modules.is_empty());
    }
}
