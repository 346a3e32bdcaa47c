//! Subcommand execution.
//!
//! Each command produces a [`Report`]; failures that prevent a report from
//! being built surface as [`AppError`].

use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use weft_query::{
    BracketPairs, BracketTable, CancellationToken, Engine, EngineConfig, Feature, HighlightMap,
    IndentDirection, IndentMarkers, InjectionState, LineIndex, MatchResult, Parser, QueryLoader,
    RuleSet, SupportedLanguage, SyntaxTree, TextObjects,
};

use crate::cli::Command;
use crate::errors::AppError;
use crate::output::{
    BracketItem, BracketsReport, CheckReport, CheckedFile, FeatureItems, HighlightItem, IndentItem,
    InjectionItem, Position, Report, RunReport, Span, TextObjectItem,
};

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub(crate) engine: EngineConfig,
    pub(crate) queries_dirs: Vec<Utf8PathBuf>,
}

pub(crate) fn execute(command: &Command, settings: &Settings) -> Result<Report, AppError> {
    match command {
        Command::Check { strict, queries } => Ok(Report::Check(check(queries, *strict)?)),
        Command::Run {
            language,
            feature,
            query,
            source,
        } => {
            let request = RunRequest {
                language: *language,
                feature: *feature,
                query: query.as_deref(),
                source,
            };
            Ok(Report::Run(run(&request, settings)?))
        }
        Command::Brackets {
            query,
            language,
            source,
        } => Ok(Report::Brackets(brackets(
            query.as_deref(),
            language.as_deref(),
            source,
            settings,
        )?)),
    }
}

fn read(path: &Utf8Path) -> Result<String, AppError> {
    fs::read_to_string(path).map_err(|source| AppError::ReadInput {
        path: path.to_path_buf(),
        source,
    })
}

fn load_engine(settings: &Settings) -> Result<Engine, AppError> {
    let loader = settings
        .queries_dirs
        .iter()
        .fold(QueryLoader::new(), |loader, dir| loader.with_search_dir(dir.clone()));
    let mut engine = Engine::new(settings.engine);
    let report = engine.load(&loader)?;
    for diagnostic in report.diagnostics() {
        tracing::warn!(%diagnostic, "rule file degraded");
    }
    Ok(engine)
}

// =============================================================================
// check
// =============================================================================

fn check(queries: &[Utf8PathBuf], strict: bool) -> Result<CheckReport, AppError> {
    let mut files = Vec::with_capacity(queries.len());
    for path in queries {
        let text = read(path)?;
        let compiled = if strict {
            RuleSet::compile_strict(&text)
        } else {
            RuleSet::compile(&text)
        };
        let file = match compiled {
            Ok(rules) => CheckedFile {
                path: path.clone(),
                ok: true,
                declared: rules.declared(),
                usable: rules.len(),
                diagnostics: rules
                    .rejected()
                    .iter()
                    .map(|diagnostic| diagnostic.clone().with_uri(path.as_str()))
                    .collect(),
            },
            Err(err) => CheckedFile {
                path: path.clone(),
                ok: false,
                declared: 0,
                usable: 0,
                diagnostics: vec![err.diagnostic().with_uri(path.as_str())],
            },
        };
        tracing::info!(%path, ok = file.ok, usable = file.usable, "checked rule file");
        files.push(file);
    }
    Ok(CheckReport { files })
}

// =============================================================================
// run
// =============================================================================

struct RunRequest<'a> {
    language: Option<SupportedLanguage>,
    feature: Feature,
    query: Option<&'a Utf8Path>,
    source: &'a Utf8Path,
}

/// Source text with its tree and a line index for display positions.
struct Parsed {
    text: String,
    tree: SyntaxTree,
    index: LineIndex,
}

impl Parsed {
    fn span(&self, range: std::ops::Range<usize>) -> Span {
        Span::new(&self.text, &self.index, range)
    }
}

fn run(request: &RunRequest<'_>, settings: &Settings) -> Result<RunReport, AppError> {
    let language = request
        .language
        .or_else(|| SupportedLanguage::from_path(request.source))
        .ok_or_else(|| AppError::UnknownLanguage {
            path: request.source.to_path_buf(),
        })?;
    let mut engine = load_engine(settings)?;
    if let Some(query) = request.query {
        let rules = read(query)?;
        engine
            .compile(language.as_str(), request.feature, &rules)
            .map_err(|source| AppError::Compile {
                path: query.to_path_buf(),
                source,
            })?;
    }

    let text = read(request.source)?;
    let tree = Parser::new(language)
        .and_then(|mut parser| parser.parse(&text))
        .map_err(|source| AppError::Parse {
            path: request.source.to_path_buf(),
            source,
        })?;
    let parsed = Parsed {
        index: LineIndex::new(&text),
        text,
        tree,
    };
    tracing::info!(path = %request.source, %language, feature = %request.feature, "running rules");

    let cancel = CancellationToken::new();
    let label = language.as_str();
    let (items, warnings) = if request.feature == Feature::Injections {
        let layers = engine.injections(label, Feature::Highlights, &parsed.tree, &cancel)?;
        (injection_items(&parsed, &layers), Vec::new())
    } else {
        let result = engine.matches(label, request.feature, &parsed.tree, &cancel)?;
        let messages = result.warnings().iter().map(ToString::to_string).collect();
        (feature_items(&parsed, request.feature, &result), messages)
    };

    Ok(RunReport {
        path: request.source.to_path_buf(),
        language: label.to_owned(),
        items,
        warnings,
    })
}

fn feature_items(parsed: &Parsed, feature: Feature, result: &MatchResult) -> FeatureItems {
    let tree = &parsed.tree;
    match feature {
        Feature::Highlights => FeatureItems::Highlights(
            HighlightMap::resolve(result)
                .spans(tree)
                .into_iter()
                .map(|span| HighlightItem {
                    tag: span.tag.name().to_owned(),
                    rank: span.tag.rank(),
                    span: parsed.span(span.range),
                })
                .collect(),
        ),
        Feature::Indents => FeatureItems::Indents(
            IndentMarkers::resolve(tree, result)
                .scan()
                .steps()
                .iter()
                .map(|step| IndentItem {
                    at: Position::at(&parsed.index, step.marker.byte),
                    byte: step.marker.byte,
                    direction: direction_label(step.marker.direction),
                    depth: step.depth,
                    capture: step.marker.capture.to_string(),
                })
                .collect(),
        ),
        Feature::Brackets => FeatureItems::Brackets(
            BracketPairs::resolve(tree, result)
                .pairs()
                .iter()
                .map(|pair| BracketItem {
                    open: parsed.span(pair.open_range.clone()),
                    close: parsed.span(pair.close_range.clone()),
                })
                .collect(),
        ),
        Feature::TextObjects => FeatureItems::TextObjects(
            TextObjects::resolve(tree, result)
                .objects()
                .iter()
                .map(|object| TextObjectItem {
                    span: parsed.span(object.range.clone()),
                    object: object.object.clone(),
                    variant: object.variant.as_str(),
                    rank: object.rank,
                })
                .collect(),
        ),
        Feature::Injections => FeatureItems::Injections(Vec::new()),
    }
}

fn injection_items(parsed: &Parsed, layers: &weft_query::InjectionLayers) -> FeatureItems {
    FeatureItems::Injections(
        layers
            .layers()
            .iter()
            .map(|layer| InjectionItem {
                span: parsed.span(layer.injection.range.clone()),
                language: layer.injection.language.clone(),
                depth: layer.depth,
                parent: layer.parent,
                state: state_label(&layer.state),
                matches: layer.result.as_ref().map(MatchResult::len),
            })
            .collect(),
    )
}

const fn direction_label(direction: IndentDirection) -> &'static str {
    match direction {
        IndentDirection::Open => "open",
        IndentDirection::Close => "close",
        IndentDirection::None => "none",
    }
}

const fn state_label(state: &InjectionState) -> &'static str {
    match state {
        InjectionState::Unvisited => "unvisited",
        InjectionState::Injected(_) => "injected",
        InjectionState::Recursed => "recursed",
    }
}

// =============================================================================
// brackets
// =============================================================================

fn brackets(
    query: Option<&Utf8Path>,
    language: Option<&str>,
    source: &Utf8Path,
    settings: &Settings,
) -> Result<BracketsReport, AppError> {
    let declared = match (query, language) {
        (Some(query_path), _) => {
            let rules = RuleSet::compile(&read(query_path)?).map_err(|err| AppError::Compile {
                path: query_path.to_path_buf(),
                source: err,
            })?;
            BracketTable::from_rule_set(&rules)
        }
        (None, Some(label)) => load_engine(settings)?.bracket_table(label),
        (None, None) => BracketTable::markup(),
    };
    let table = if declared.is_empty() {
        tracing::warn!(path = %source, "no delimiter pairs declared; using markup defaults");
        BracketTable::markup()
    } else {
        declared
    };

    let text = read(source)?;
    let index = LineIndex::new(&text);
    let scan = table.scan(&text);
    tracing::info!(
        path = %source,
        pairs = scan.pairs.len(),
        unmatched = scan.unmatched.len(),
        "scanned delimiters"
    );

    Ok(BracketsReport {
        path: source.to_path_buf(),
        pairs: scan
            .pairs
            .iter()
            .map(|pair| BracketItem {
                open: Span::new(&text, &index, pair.open.clone()),
                close: Span::new(&text, &index, pair.close.clone()),
            })
            .collect(),
        unmatched: scan
            .unmatched
            .iter()
            .map(|range| Span::new(&text, &index, range.clone()))
            .collect(),
    })
}
