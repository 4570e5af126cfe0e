use std::path::PathBuf;

use oxc_allocator::Allocator;
use oxc_ast::ast::Program;
use oxc_codegen::{Codegen, CodegenOptions, CodegenReturn};
use oxc_parser::{ParseOptions, Parser};
use oxc_span::SourceType;
use tracing::{debug, debug_span};

mod transforms;

/// Plugin API version this engine speaks. Hosts declaring another version are rejected up front.
pub const API_VERSION: u32 = 1;

pub struct Esmify {
    parse_options: ParseOptions,
    codegen_options: CodegenOptions,
    transforms: Vec<Box<dyn Transform>>,
}

impl Default for Esmify {
    fn default() -> Self {
        Self {
            parse_options: ParseOptions { parse_regular_expression: true, ..ParseOptions::default() },
            codegen_options: CodegenOptions::default(),
            transforms: vec![Box::new(transforms::commonjs::CommonJsToEsm)],
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConvertOptions {
    pub source_type: Option<SourceType>,
    pub filename_for_source_type: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Host API version {found} is not supported, this engine requires version {required}")]
    IncompatibleHost { required: u32, found: u32 },
    #[error("Failed to determine source type for {}: {message}", .path.display())]
    InvalidSourceType { path: PathBuf, message: String },
    #[error("Parsing failed: {}", .errors.join("; "))]
    ParseFailed { errors: Vec<String> },
}

pub struct ConvertResult {
    pub modified: bool,
    pub code: String,
}

pub trait Transform {
    fn name(&self) -> &'static str;

    fn run<'a>(&self, ctx: &mut TransformCtx<'a>, program: &mut Program<'a>) -> bool;
}

pub struct TransformCtx<'a> {
    pub allocator: &'a Allocator,
}

impl Esmify {
    /// Builds an engine for a host that declares `host_api_version`.
    pub fn for_host(host_api_version: u32) -> Result<Self, Error> {
        if host_api_version != API_VERSION {
            return Err(Error::IncompatibleHost { required: API_VERSION, found: host_api_version });
        }
        Ok(Self::default())
    }

    /// Rewrites `program` in place. Every transform runs exactly once; running this twice on the
    /// same tree is not supported.
    pub fn transform_program<'a>(&self, allocator: &'a Allocator, program: &mut Program<'a>) -> bool {
        let mut modified = false;
        let mut ctx = TransformCtx { allocator };
        for t in &self.transforms {
            let _span = debug_span!("transform", name = t.name()).entered();
            if t.run(&mut ctx, program) {
                debug!("program modified");
                modified = true;
            }
        }
        modified
    }

    pub fn convert(&self, source_text: &str, opts: ConvertOptions) -> Result<ConvertResult, Error> {
        let allocator = Allocator::default();

        let source_type = if let Some(st) = opts.source_type {
            st
        } else if let Some(path) = opts.filename_for_source_type.as_ref() {
            SourceType::from_path(path)
                .map_err(|e| Error::InvalidSourceType { path: path.clone(), message: e.to_string() })?
        } else {
            SourceType::mjs()
        };

        let parse_ret = Parser::new(&allocator, source_text, source_type)
            .with_options(self.parse_options)
            .parse();

        if !parse_ret.errors.is_empty() {
            return Err(Error::ParseFailed { errors: parse_ret.errors.iter().map(|e| e.to_string()).collect() });
        }

        let mut program = parse_ret.program;
        let modified = self.transform_program(&allocator, &mut program);

        let CodegenReturn { code, .. } = Codegen::new().with_options(self.codegen_options.clone()).build(&program);

        Ok(ConvertResult { modified, code })
    }
}
