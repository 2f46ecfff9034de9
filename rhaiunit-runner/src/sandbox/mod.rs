// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The scripting sandbox test files are evaluated in.
//!
//! A [`Sandbox`] wraps a Rhai [`Engine`] that exposes a small, fixed set of host primitives:
//!
//! * `load(path)` evaluates another script and makes its functions available;
//! * `print(...)` writes a line, formatting `printf`-style when the arguments look like a format
//!   string (see [`print::render`]);
//! * `readFile(path)` returns the text of a file or bundled resource;
//! * `bindings::bind`, `bindings::lookup` and `bindings::unbind` access the [`BindingStore`].
//!
//! Module imports through the filesystem are disabled.
//!
//! # Function visibility
//!
//! Functions declared by every loaded file are collected into a single library that all later
//! evaluations run against. When `load` is called from the host, the functions are visible as soon
//! as it returns. When it is called from the top level of a file, they are visible to the
//! statements of that file that follow the call. Function bodies only see them once the
//! host-level call that is running the script returns, since a running function's library cannot
//! be extended.
//!
//! A file that is loaded again while it is still loading is an error.

mod bindings;
pub mod print;
mod resources;

pub use bindings::*;
pub use print::PrintSink;
pub use resources::*;

use crate::{
    boundary::{self, SourceTable},
    errors::ResourceError,
    model::{HostException, StackFrame, Throwable},
};
use debug_ignore::DebugIgnore;
use regex::Regex;
use rhai::{
    AST, ASTFlags, Array, CallFnOptions, Dynamic, Engine, EvalAltResult, FuncArgs, Map, Module,
    NativeCallContext, Position, Scope, Stmt, module_resolvers::DummyModuleResolver,
};
use std::{
    any::TypeId,
    cell::{Cell, RefCell},
    collections::HashMap,
    rc::Rc,
    sync::LazyLock,
};
use tracing::debug;

static FN_DECL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bfn\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(").expect("function regex is valid")
});

static LOAD_CALL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bload\s*\(").expect("load regex is valid"));

/// Expression depth limits, the same in debug and release builds.
const MAX_EXPR_DEPTH: usize = 64;
const MAX_FUNCTION_EXPR_DEPTH: usize = 64;

/// Nesting limit for script function calls.
const MAX_CALL_LEVELS: usize = 64;

/// The host class name of the error raised when a file loads itself, directly or indirectly.
pub const LOAD_CYCLE_CLASS: &str = "rhaiunit::LoadCycle";

/// Configuration for a [`Sandbox`].
#[derive(Clone, Debug)]
pub struct SandboxConfig {
    resources: ResourceSet,
    print_sink: PrintSink,
    bindings: BindingStore,
    cache_asts: bool,
}

impl SandboxConfig {
    /// Creates a config with the bundled resources, printing to stdout, an empty binding store
    /// and AST caching enabled.
    pub fn new() -> Self {
        Self {
            resources: ResourceSet::new(),
            print_sink: PrintSink::Stdout,
            bindings: BindingStore::new(),
            cache_asts: true,
        }
    }

    /// Sets the resources `load` and `readFile` resolve against.
    pub fn with_resources(mut self, resources: ResourceSet) -> Self {
        self.resources = resources;
        self
    }

    /// Sets where `print` writes.
    pub fn with_print_sink(mut self, print_sink: PrintSink) -> Self {
        self.print_sink = print_sink;
        self
    }

    /// Sets the binding store exposed as the `bindings` module.
    pub fn with_bindings(mut self, bindings: BindingStore) -> Self {
        self.bindings = bindings;
        self
    }

    /// Sets whether compiled scripts are cached by resolved location.
    pub fn with_ast_caching(mut self, cache_asts: bool) -> Self {
        self.cache_asts = cache_asts;
        self
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A function declared by a loaded script.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptFn {
    /// The function name.
    pub name: String,

    /// The parameter names.
    pub params: Vec<String>,
}

impl ScriptFn {
    fn to_dynamic(&self) -> Dynamic {
        let params: Array = self
            .params
            .iter()
            .map(|param| Dynamic::from(param.clone()))
            .collect();
        let mut map = Map::new();
        map.insert("name".into(), Dynamic::from(self.name.clone()));
        map.insert("params".into(), Dynamic::from_array(params));
        Dynamic::from_map(map)
    }
}

/// A sandboxed script evaluation environment.
#[derive(Debug)]
pub struct Sandbox {
    engine: DebugIgnore<Engine>,
    state: Rc<SandboxState>,
}

impl Sandbox {
    /// Creates a new sandbox.
    pub fn new(config: SandboxConfig) -> Self {
        let SandboxConfig {
            resources,
            print_sink,
            bindings,
            cache_asts,
        } = config;

        let state = Rc::new(SandboxState {
            resources,
            lib: RefCell::new(AST::empty()),
            pending: RefCell::new(Vec::new()),
            sources: RefCell::new(SourceTable::default()),
            ast_cache: RefCell::new(HashMap::new()),
            cache_asts: Cell::new(cache_asts),
            loading: RefCell::new(Vec::new()),
        });

        let mut engine = Engine::new();
        // Rhai lowers these limits in debug builds.
        engine
            .set_max_expr_depths(MAX_EXPR_DEPTH, MAX_FUNCTION_EXPR_DEPTH)
            .set_max_call_levels(MAX_CALL_LEVELS);
        engine.set_module_resolver(DummyModuleResolver::new());
        engine.on_print(move |text| print_sink.write_line(text));
        engine.on_debug(|text, source, pos| {
            debug!(
                target: "rhaiunit_runner::script",
                "{} @ {pos}: {text}",
                source.unwrap_or("<unknown>"),
            );
        });
        register_print(&mut engine);
        engine.register_static_module(BINDINGS_MODULE, bindings.to_module().into());

        let load_state = state.clone();
        engine.register_fn(
            "load",
            move |ctx: NativeCallContext, path: &str| -> Result<Array, Box<EvalAltResult>> {
                load_state.load_from_script(ctx.engine(), path)
            },
        );

        let read_state = state.clone();
        engine.register_fn(
            "readFile",
            move |path: &str| -> Result<String, Box<EvalAltResult>> {
                read_state
                    .resources
                    .resolve(path)
                    .map(Resource::into_text)
                    .map_err(|err| throw_into_script(host_exception(&err, "readFile").into()))
            },
        );

        Self {
            engine: DebugIgnore(engine),
            state,
        }
    }

    /// Returns the engine, to register additional types and modules.
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// Sets whether compiled scripts are cached by resolved location.
    pub fn set_ast_caching(&mut self, cache_asts: bool) {
        self.state.cache_asts.set(cache_asts);
        if !cache_asts {
            self.state.ast_cache.borrow_mut().clear();
        }
    }

    /// Loads and runs a script, making its functions visible to later calls.
    ///
    /// Returns the functions the script declared, in declaration order.
    pub fn load(&self, path: &str) -> Result<Vec<ScriptFn>, Throwable> {
        debug!("loading `{path}`");
        let result = self.state.load_file(&self.engine, path);
        self.state.commit_pending();
        result
    }

    /// Calls a script function with the given arguments.
    pub fn call_fn(&self, name: &str, args: impl FuncArgs) -> Result<Dynamic, Throwable> {
        self.call_with_options(CallFnOptions::new(), name, args)
    }

    /// Calls a zero-parameter script function with `this` bound to `this`.
    ///
    /// Changes the function makes to `this` are kept.
    pub fn call_method(&self, name: &str, this: &mut Dynamic) -> Result<Dynamic, Throwable> {
        self.call_method_with_args(name, this, ())
    }

    /// Calls a script function with `this` bound to `this` and the given arguments.
    pub fn call_method_with_args(
        &self,
        name: &str,
        this: &mut Dynamic,
        args: impl FuncArgs,
    ) -> Result<Dynamic, Throwable> {
        self.call_with_options(CallFnOptions::new().bind_this_ptr(this), name, args)
    }

    fn call_with_options(
        &self,
        options: CallFnOptions<'_>,
        name: &str,
        args: impl FuncArgs,
    ) -> Result<Dynamic, Throwable> {
        let lib = self.state.lib.borrow().clone();
        let mut scope = Scope::new();
        let options = options.eval_ast(false).rewind_scope(true);
        let result =
            self.engine
                .call_fn_with_options::<Dynamic>(options, &mut scope, &lib, name, args);
        self.state.commit_pending();
        result.map_err(|err| self.state.decode(err, None))
    }

    /// Evaluates a script snippet against the loaded functions.
    pub fn eval(&self, source_name: &str, script: &str) -> Result<Dynamic, Throwable> {
        let text: Rc<str> = Rc::from(script);
        self.state
            .sources
            .borrow_mut()
            .add_source(source_name, text.clone());
        let result = match self.engine.compile(&*text) {
            Ok(mut ast) => {
                ast.set_source(source_name);
                let combined = self.state.lib.borrow().merge(&ast);
                self.engine
                    .eval_ast::<Dynamic>(&combined)
                    .map_err(|err| self.state.decode(err, Some(source_name)))
            }
            Err(err) => Err(self.state.decode(err.into(), Some(source_name))),
        };
        self.state.commit_pending();
        result
    }

    /// Returns true if a script function with this name and number of parameters is loaded.
    pub fn has_function(&self, name: &str, params: usize) -> bool {
        self.state
            .lib
            .borrow()
            .iter_functions()
            .any(|f| f.name == name && f.params.len() == params)
    }

    /// Returns the table used to attach source text to errors.
    pub fn sources(&self) -> std::cell::Ref<'_, SourceTable> {
        self.state.sources.borrow()
    }
}

#[derive(Debug)]
struct SandboxState {
    resources: ResourceSet,
    // Functions only: the statements of loaded files are never kept.
    lib: RefCell<AST>,
    // Functions loaded while a host-level call is running.
    pending: RefCell<Vec<AST>>,
    sources: RefCell<SourceTable>,
    ast_cache: RefCell<HashMap<String, (AST, Rc<str>)>>,
    cache_asts: Cell<bool>,
    // Files being loaded, outermost first: (resolved location, path as requested).
    loading: RefCell<Vec<(String, String)>>,
}

impl SandboxState {
    fn load_from_script(&self, engine: &Engine, path: &str) -> Result<Array, Box<EvalAltResult>> {
        debug!("loading `{path}` from script");
        let functions = self.load_file(engine, path).map_err(throw_into_script)?;
        Ok(functions.iter().map(ScriptFn::to_dynamic).collect())
    }

    /// Compiles and runs a file, staging its functions.
    fn load_file(&self, engine: &Engine, path: &str) -> Result<Vec<ScriptFn>, Throwable> {
        let (ast, text, location) = self.compile(engine, path)?;
        self.check_cycle(&location, path)?;

        let functions = declared_functions(&ast, &text);
        {
            let mut sources = self.sources.borrow_mut();
            for function in &functions {
                sources.add_function(&function.name, path);
            }
        }

        self.loading.borrow_mut().push((location, path.to_owned()));
        let result = if LOAD_CALL_REGEX.is_match(&text) {
            self.run_statements(engine, &ast, path)
        } else {
            let mut combined = self.library();
            combined.combine(ast.clone());
            engine
                .run_ast(&combined)
                .map_err(|err| self.decode(err, Some(path)))
        };
        self.loading.borrow_mut().pop();
        result?;

        self.pending.borrow_mut().push(ast.clone_functions_only());
        Ok(functions)
    }

    /// Runs the top-level statements of a file one at a time, so that functions loaded by one
    /// statement are visible to the next.
    fn run_statements(&self, engine: &Engine, ast: &AST, path: &str) -> Result<(), Throwable> {
        let functions = ast.clone_functions_only();
        let mut scope = Scope::new();
        for stmt in ast.statements() {
            let mut step = self.library();
            step.combine(functions.clone());
            step.combine(AST::new([stmt.clone()], Module::new()));
            step.set_source(path);
            engine
                .run_ast_with_scope(&mut scope, &step)
                .map_err(|err| self.decode(err, Some(path)))?;

            // A top-level `return` ends the file.
            if matches!(stmt, Stmt::Return(_, flags, _) if !flags.contains(ASTFlags::BREAK)) {
                break;
            }
        }
        Ok(())
    }

    /// The committed library plus the functions staged by the current host-level call.
    fn library(&self) -> AST {
        let mut combined = self.lib.borrow().clone();
        for staged in self.pending.borrow().iter() {
            combined.combine(staged.clone());
        }
        combined
    }

    fn check_cycle(&self, location: &str, path: &str) -> Result<(), Throwable> {
        let loading = self.loading.borrow();
        let Some(start) = loading.iter().position(|(loc, _)| loc == location) else {
            return Ok(());
        };
        let cycle = loading[start..]
            .iter()
            .map(|(_, path)| path.as_str())
            .chain(std::iter::once(path))
            .collect::<Vec<_>>()
            .join(" -> ");
        let mut exc = HostException::new(
            LOAD_CYCLE_CLASS,
            Some(format!("{path} is already being loaded: {cycle}")),
        );
        exc.push_frame(StackFrame::native("load"));
        Err(exc.into())
    }

    fn compile(&self, engine: &Engine, path: &str) -> Result<(AST, Rc<str>, String), Throwable> {
        let resource = self
            .resources
            .resolve(path)
            .map_err(|err| Throwable::from(host_exception(&err, "load")))?;
        let cache_key = resource.location().to_string();

        if self.cache_asts.get() {
            if let Some((ast, text)) = self.ast_cache.borrow().get(&cache_key) {
                debug!("using cached AST for `{cache_key}`");
                self.sources.borrow_mut().add_source(path, text.clone());
                return Ok((ast.clone(), text.clone(), cache_key));
            }
        }

        let text: Rc<str> = Rc::from(resource.into_text());
        self.sources.borrow_mut().add_source(path, text.clone());
        let mut ast = engine
            .compile(&*text)
            .map_err(|err| self.decode(err.into(), Some(path)))?;
        ast.set_source(path);

        if self.cache_asts.get() {
            self.ast_cache
                .borrow_mut()
                .insert(cache_key.clone(), (ast.clone(), text.clone()));
        }
        Ok((ast, text, cache_key))
    }

    fn commit_pending(&self) {
        let pending = std::mem::take(&mut *self.pending.borrow_mut());
        if pending.is_empty() {
            return;
        }
        let mut lib = self.lib.borrow_mut();
        for staged in pending {
            lib.combine(staged);
        }
    }

    fn decode(&self, err: Box<EvalAltResult>, top_source: Option<&str>) -> Throwable {
        Throwable::Script(boundary::decode(err, top_source, &self.sources.borrow()))
    }
}

/// Functions declared in a script, in the order they appear in its text.
///
/// Anonymous functions created by closures are skipped.
fn declared_functions(ast: &AST, text: &str) -> Vec<ScriptFn> {
    let mut offsets = HashMap::new();
    for caps in FN_DECL_REGEX.captures_iter(text) {
        if let Some(name) = caps.get(1) {
            offsets.entry(name.as_str()).or_insert(name.start());
        }
    }

    let mut functions: Vec<(usize, ScriptFn)> = ast
        .iter_functions()
        .filter_map(|f| {
            let offset = *offsets.get(f.name)?;
            Some((
                offset,
                ScriptFn {
                    name: f.name.to_owned(),
                    params: f.params.iter().map(|p| (*p).to_owned()).collect(),
                },
            ))
        })
        .collect();
    functions.sort_by(|(a_offset, a), (b_offset, b)| {
        a_offset
            .cmp(b_offset)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.params.len().cmp(&b.params.len()))
    });
    functions.into_iter().map(|(_, f)| f).collect()
}

fn host_exception(err: &ResourceError, native_fn: &str) -> HostException {
    let mut exc = HostException::from_error(err.class_name(), err);
    exc.push_frame(StackFrame::native(native_fn));
    exc
}

/// Converts a throwable into an error thrown into the calling script.
fn throw_into_script(throwable: Throwable) -> Box<EvalAltResult> {
    let value = match throwable {
        Throwable::AssertionFailed(failure) => Dynamic::from(failure),
        Throwable::Host(exc) => Dynamic::from(exc),
        Throwable::Script(mut exc) => {
            exc.push_frame(StackFrame::native("load"));
            Dynamic::from(exc)
        }
    };
    Box::new(EvalAltResult::ErrorRuntime(value, Position::NONE))
}

/// The most arguments `print` accepts. Rhai only matches `Dynamic` parameters up to this arity.
const MAX_PRINT_ARGS: usize = 16;

fn register_print(engine: &mut Engine) {
    engine.register_fn("print", || print::render(&[]));
    // The single-argument form is Rhai's own.
    for arity in 2..=MAX_PRINT_ARGS {
        engine.register_raw_fn(
            "print",
            vec![TypeId::of::<Dynamic>(); arity],
            |_ctx, args| {
                let args: Vec<Dynamic> = args.iter().map(|arg| (**arg).clone()).collect();
                Ok(print::render(&args))
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{Classified, classify};
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use rhai::INT;

    fn sandbox_in(dir: &Utf8TempDir) -> (Sandbox, Rc<RefCell<String>>) {
        let (sink, buf) = PrintSink::buffer();
        let config = SandboxConfig::new()
            .with_resources(ResourceSet::new().with_dirs([dir.path().to_owned()]))
            .with_print_sink(sink);
        (Sandbox::new(config), buf)
    }

    fn write(dir: &Utf8TempDir, name: &str, contents: &str) {
        std::fs::write(dir.path().join(name), contents).expect("wrote script");
    }

    #[test]
    fn host_load_makes_functions_visible() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(
            &dir,
            "calc.rhai",
            indoc! {r#"
                fn sub(a, b) { a - b }
                fn add(a, b) { a + b }
                print("calc loaded");
            "#},
        );
        let (sandbox, buf) = sandbox_in(&dir);

        let functions = sandbox.load("calc.rhai").expect("calc loads");
        assert_eq!(
            functions
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>(),
            vec!["sub", "add"],
            "functions are in declaration order"
        );
        assert_eq!(functions[0].params, vec!["a", "b"]);
        assert_eq!(*buf.borrow(), "calc loaded\n");

        let sum = sandbox
            .call_fn("add", (1 as INT, 2 as INT))
            .expect("add runs");
        assert_eq!(sum.as_int().ok(), Some(3));
        assert!(sandbox.has_function("sub", 2));
    }

    #[test]
    fn script_load_returns_metadata_and_commits_later() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(&dir, "calc.rhai", "fn add(a, b) { a + b }\nfn zero() { 0 }\n");
        write(
            &dir,
            "driver.rhai",
            indoc! {r#"
                fn names() {
                    let fns = load("calc.rhai");
                    let out = [];
                    for f in fns { out.push(`${f.name}/${f.params.len()}`); }
                    out
                }
            "#},
        );
        let (sandbox, _) = sandbox_in(&dir);
        sandbox.load("driver.rhai").expect("driver loads");

        let names = sandbox.call_fn("names", ()).expect("names runs");
        let names: Vec<String> = names
            .into_typed_array::<rhai::ImmutableString>()
            .expect("array of strings")
            .into_iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(names, vec!["add/2", "zero/0"]);

        // The call above has returned, so the staged functions are now visible.
        let sum = sandbox
            .call_fn("add", (2 as INT, 3 as INT))
            .expect("add runs");
        assert_eq!(sum.as_int().ok(), Some(5));
    }

    #[test]
    fn top_level_code_sees_loaded_functions() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(&dir, "calc.rhai", "fn add(a, b) { a + b }\n");
        write(
            &dir,
            "user.rhai",
            indoc! {r#"
                let before = 1;
                load("calc.rhai");
                let three = add(before, 2);
                print(`three=${three}`);
                fn double(x) { add(x, x) }
                print(`four=${double(2)}`);
            "#},
        );
        let (sandbox, buf) = sandbox_in(&dir);

        let functions = sandbox.load("user.rhai").expect("user loads");
        assert_eq!(functions, vec![ScriptFn {
            name: "double".to_owned(),
            params: vec!["x".to_owned()],
        }]);
        assert_eq!(*buf.borrow(), "three=3\nfour=4\n");
    }

    #[test]
    fn top_level_return_ends_the_file() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(&dir, "calc.rhai", "fn add(a, b) { a + b }\n");
        write(
            &dir,
            "early.rhai",
            indoc! {r#"
                load("calc.rhai");
                print(`sum=${add(1, 1)}`);
                return;
                print("unreachable");
            "#},
        );
        let (sandbox, buf) = sandbox_in(&dir);

        sandbox.load("early.rhai").expect("early loads");
        assert_eq!(*buf.borrow(), "sum=2\n");
    }

    #[test]
    fn load_cycle_is_an_error() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(&dir, "a.rhai", "load(\"b.rhai\");\nfn from_a() { 1 }\n");
        write(&dir, "b.rhai", "load(\"a.rhai\");\nfn from_b() { 2 }\n");
        write(&dir, "self.rhai", "load(\"self.rhai\");\n");
        let (mut sandbox, _) = sandbox_in(&dir);
        sandbox.set_ast_caching(false);

        let err = sandbox.load("a.rhai").expect_err("cycle is detected");
        let dump = err.stack_dump();
        assert!(
            dump.contains(&format!(
                "{LOAD_CYCLE_CLASS}: a.rhai is already being loaded: a.rhai -> b.rhai -> a.rhai"
            )),
            "unexpected error:\n{dump}"
        );

        let err = sandbox.load("self.rhai").expect_err("cycle is detected");
        let dump = err.stack_dump();
        assert!(
            dump.contains("self.rhai is already being loaded: self.rhai -> self.rhai"),
            "unexpected error:\n{dump}"
        );

        // Nothing is left marked as loading: a file without a cycle still loads.
        write(&dir, "b.rhai", "fn from_b() { 2 }\n");
        sandbox.load("a.rhai").expect("a loads once the cycle is gone");
        let value = sandbox.call_fn("from_b", ()).expect("from_b runs");
        assert_eq!(value.as_int().ok(), Some(2));
    }

    #[test]
    fn deeply_nested_functions_compile() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let depth = 10;
        write(
            &dir,
            "deep.rhai",
            &format!(
                "fn deep() {{ {}1{} }}\n",
                "if true { ".repeat(depth),
                " } else { 0 }".repeat(depth)
            ),
        );
        let (sandbox, _) = sandbox_in(&dir);

        sandbox.load("deep.rhai").expect("deep loads");
        let value = sandbox.call_fn("deep", ()).expect("deep runs");
        assert_eq!(value.as_int().ok(), Some(1));
    }

    #[test]
    fn call_method_keeps_changes_to_this() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(
            &dir,
            "fixture.rhai",
            "fn set_up() { this.sum = 2; }\nfn check() { this.sum + 1 }\n",
        );
        let (sandbox, _) = sandbox_in(&dir);
        sandbox.load("fixture.rhai").expect("fixture loads");

        let mut this = Dynamic::from_map(Map::new());
        sandbox.call_method("set_up", &mut this).expect("set_up runs");
        let checked = sandbox.call_method("check", &mut this).expect("check runs");
        assert_eq!(checked.as_int().ok(), Some(3));
    }

    #[test]
    fn print_formats_through_engine() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let (sandbox, buf) = sandbox_in(&dir);
        sandbox
            .eval(
                "snippet.rhai",
                r#"print("%s=%d", "x", 4); print("a", 1, true); print("plain");"#,
            )
            .expect("snippet runs");
        assert_eq!(*buf.borrow(), "x=4\na 1 true\nplain\n");
    }

    #[test]
    fn print_accepts_many_arguments() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let (sandbox, buf) = sandbox_in(&dir);
        sandbox
            .eval(
                "snippet.rhai",
                indoc! {r#"
                    print("a", "b", "c", "d", "e", "f", "g");
                    print("%d%d%d%d%d%d%d%d%d%d%d%d%d%d%d", 1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 1, 2, 3, 4, 5);
                    print();
                "#},
            )
            .expect("snippet runs");
        assert_eq!(*buf.borrow(), "a b c d e f g\n123456789012345\n\n");
    }

    #[test]
    fn read_file_resolves_resources() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(&dir, "data.txt", "line one\nline two\n");
        let (sandbox, _) = sandbox_in(&dir);

        let text = sandbox
            .eval("snippet.rhai", r#"readFile("/data.txt")"#)
            .expect("read succeeds");
        assert_eq!(text.into_string().ok().as_deref(), Some("line one\nline two\n"));
    }

    #[test]
    fn read_file_missing_is_host_error() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let (sandbox, _) = sandbox_in(&dir);

        let err = sandbox
            .eval("snippet.rhai", "let x = 1;\nreadFile(\"missing.txt\")")
            .expect_err("read fails");
        match classify(err) {
            Classified::Errored(error) => {
                assert_eq!(error.class_name(), "rhaiunit::ResourceNotFound");
                assert_eq!(error.message(), Some("could not find file: missing.txt"));
                assert_eq!(
                    error.stack_dump(),
                    "rhaiunit::ResourceNotFound: could not find file: missing.txt\n\
                     \tat readFile [native]\n\
                     \tat <script> (snippet.rhai:2:1)\n"
                );
            }
            Classified::Failed(failure) => panic!("expected error, got {failure:?}"),
        }
    }

    #[test]
    fn syntax_error_has_location() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(&dir, "broken.rhai", "fn ok() { 1 }\nlet x = (1 + ;\n");
        let (sandbox, _) = sandbox_in(&dir);

        let err = sandbox.load("broken.rhai").expect_err("syntax error");
        assert_eq!(err.class_name(), boundary::ScriptException::PARSE_ERROR);
        let location = err.script_location().expect("parse errors have a location");
        assert_eq!(location.source(), Some("broken.rhai"));
        assert_eq!(location.line(), 2);
        assert_eq!(location.line_text(), Some("let x = (1 + ;"));
    }

    #[test]
    fn script_load_of_missing_file_is_catchable() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        let (sandbox, _) = sandbox_in(&dir);

        let caught = sandbox
            .eval(
                "snippet.rhai",
                r#"let caught = false; try { load("nope.rhai"); } catch { caught = true; } caught"#,
            )
            .expect("snippet runs");
        assert_eq!(caught.as_bool().ok(), Some(true));
    }

    #[test]
    fn bindings_are_shared_between_sandboxes() {
        let store = BindingStore::new();
        let first = Sandbox::new(SandboxConfig::new().with_bindings(store.clone()));
        let second = Sandbox::new(SandboxConfig::new().with_bindings(store.clone()));

        first
            .eval("first.rhai", r#"bindings::bind("shared", 7)"#)
            .expect("bind runs");
        let value = second
            .eval("second.rhai", r#"bindings::lookup("shared")"#)
            .expect("lookup runs");
        assert_eq!(value.as_int().ok(), Some(7));
    }

    #[test]
    fn ast_cache_reuses_compiled_scripts() {
        let dir = Utf8TempDir::new().expect("created temp dir");
        write(&dir, "lib.rhai", "fn version() { 1 }");
        let (mut sandbox, _) = sandbox_in(&dir);

        sandbox.load("lib.rhai").expect("lib loads");
        write(&dir, "lib.rhai", "fn version() { 2 }");
        sandbox.load("lib.rhai").expect("lib loads again");
        let cached = sandbox.call_fn("version", ()).expect("version runs");
        assert_eq!(cached.as_int().ok(), Some(1), "cached AST is reused");

        sandbox.set_ast_caching(false);
        sandbox.load("lib.rhai").expect("lib loads without cache");
        let fresh = sandbox.call_fn("version", ()).expect("version runs");
        assert_eq!(fresh.as_int().ok(), Some(2), "cache disabled reads the file");
    }
}
