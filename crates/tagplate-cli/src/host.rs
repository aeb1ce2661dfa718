//! The `tp` object the CLI exposes to templates.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use indexmap::IndexMap;
use tagplate::{Context, EvalResult, Parser, StatusError, Value};

/// Nested `tp.file.include` calls allowed below the top template.
pub const MAX_INCLUDE_DEPTH: usize = 10;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

/// Renders one template file and everything it includes.
///
/// Every render level gets its own `tp` object that knows its include
/// depth, so sibling includes running concurrently never count against
/// each other.
pub struct Session {
    parser: Parser,
    template: PathBuf,
    folder: PathBuf,
    entries: Context,
}

impl Session {
    pub fn new(parser: Parser, template: &Path, entries: Context) -> Rc<Self> {
        let folder = template
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        Rc::new(Self {
            parser,
            template: template.to_path_buf(),
            folder,
            entries,
        })
    }

    /// Render the top template's source.
    pub async fn render(self: &Rc<Self>, source: &str) -> Result<String, StatusError> {
        self.render_at(source.to_string(), 0).await
    }

    fn render_at(
        self: &Rc<Self>,
        source: String,
        depth: usize,
    ) -> LocalBoxFuture<'static, Result<String, StatusError>> {
        let context = self.context(depth);
        let parser = self.parser.clone();
        async move { parser.parse_commands(&source, &context).await }.boxed_local()
    }

    fn context(self: &Rc<Self>, depth: usize) -> Context {
        let mut context = self.entries.clone();
        context.insert("tp", self.tp(depth));
        context
    }

    fn tp(self: &Rc<Self>, depth: usize) -> Value {
        let session = Rc::clone(self);
        let include = Value::native_async(move |args: Vec<Value>| {
            Rc::clone(&session).include(args, depth + 1)
        });

        let mut file = IndexMap::new();
        file.insert("title".to_string(), Value::from(self.title()));
        file.insert("path".to_string(), Value::from(self.template.display().to_string()));
        file.insert("folder".to_string(), Value::from(self.folder.display().to_string()));
        file.insert("include".to_string(), include);

        let mut date = IndexMap::new();
        date.insert("now".to_string(), Value::native(now));

        let mut tp = IndexMap::new();
        tp.insert("file".to_string(), Value::from(file));
        tp.insert("date".to_string(), Value::from(date));
        Value::from(tp)
    }

    fn title(&self) -> String {
        self.template
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    async fn include(self: Rc<Self>, args: Vec<Value>, depth: usize) -> EvalResult {
        let path = match args.into_iter().next() {
            Some(Value::String(path)) => path,
            other => {
                let found = other.map_or("undefined", |v| v.type_of());
                return Err(StatusError::invalid_argument(format!(
                    "tp.file.include expects a path, got {found}"
                ))
                .into());
            }
        };

        if depth > MAX_INCLUDE_DEPTH {
            return Err(StatusError::invalid_argument(format!(
                "Reached inclusion depth limit (max = {MAX_INCLUDE_DEPTH})"
            ))
            .into());
        }

        let file = self.folder.join(&path);
        let source = tokio::fs::read_to_string(&file)
            .await
            .map_err(|_| StatusError::not_found(format!("File {path} doesn't exist")))?;
        log::info!("including {} at depth {depth}", file.display());

        let output = self.render_at(source, depth).await?;
        Ok(Value::from(output))
    }
}

/// `tp.date.now(format?)`: the current local time.
fn now(args: Vec<Value>) -> EvalResult {
    let format = match args.first() {
        Some(Value::String(format)) => format.as_str(),
        _ => DEFAULT_DATE_FORMAT,
    };

    let mut out = String::new();
    write!(out, "{}", chrono::Local::now().format(format))
        .map_err(|_| StatusError::invalid_argument(format!("Invalid date format '{format}'")))?;
    Ok(Value::from(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tagplate::Code;

    fn render(session: &Rc<Session>, source: &str) -> Result<String, StatusError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(session.render(source))
    }

    #[test]
    fn test_file_properties() {
        let session = Session::new(Parser::new(), Path::new("notes/daily.md"), Context::new());
        let output = render(&session, "<% tp.file.title %>|<% tp.file.folder %>").unwrap();
        assert_eq!(output, "daily|notes");
    }

    #[test]
    fn test_include() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("part.md"), "part <% name %>").unwrap();
        let template = dir.path().join("main.md");

        let mut entries = Context::new();
        entries.insert("name", "one");
        let session = Session::new(Parser::new(), &template, entries);
        let output = render(&session, "[<% tp.file.include('part.md') %>]").unwrap();
        assert_eq!(output, "[part one]");
    }

    #[test]
    fn test_include_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(Parser::new(), &dir.path().join("main.md"), Context::new());
        let err = render(&session, "<% tp.file.include('nope.md') %>").unwrap_err();
        assert_eq!(err, StatusError::not_found("File nope.md doesn't exist"));
    }

    #[test]
    fn test_include_depth_limit() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("loop.md"), "<% tp.file.include('loop.md') %>").unwrap();
        let session = Session::new(Parser::new(), &dir.path().join("main.md"), Context::new());
        let err = render(&session, "<% tp.file.include('loop.md') %>").unwrap_err();
        assert_eq!(err.code, Code::InvalidArgument);
        assert_eq!(
            err.to_string(),
            "INVALID_ARGUMENT: Reached inclusion depth limit (max = 10)"
        );
    }

    #[test]
    fn test_sibling_includes_do_not_share_depth() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "a").unwrap();
        let session = Session::new(Parser::new(), &dir.path().join("main.md"), Context::new());
        let source = "<% tp.file.include('a.md') %>".repeat(12);
        assert_eq!(render(&session, &source).unwrap(), "a".repeat(12));
    }

    #[test]
    fn test_date_now() {
        let session = Session::new(Parser::new(), Path::new("a.md"), Context::new());
        assert_eq!(render(&session, "<% tp.date.now('fixed') %>").unwrap(), "fixed");

        let today = render(&session, "<% tp.date.now() %>").unwrap();
        assert_eq!(today, chrono::Local::now().format("%Y-%m-%d").to_string());
    }
}
