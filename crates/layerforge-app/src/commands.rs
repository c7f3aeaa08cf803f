//! Subcommands of the `layerforge` binary.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use layerforge_core::actions::{self, AlignEdge, DistributeMode, ZExtreme};
use layerforge_core::storage::FileStorage;
use layerforge_core::{
    Document, DocumentError, EditorConfig, LayerId, Storage, StorageError, Store, element_geometry,
};
use layerforge_render::{ExportFormat, FontBook, Renderer, RendererError, export};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Config(serde_json::Error),
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),
    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("render failed: {0}")]
    Render(#[from] RendererError),
    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),
    #[error("no layer with id `{0}`")]
    UnknownLayer(String),
    #[error("`{0}` changed nothing")]
    NoChange(&'static str),
}

pub type CliResult<T> = Result<T, CliError>;

#[derive(Parser, Debug)]
#[command(name = "layerforge", about = "Layered canvas document tool")]
pub struct Cli {
    /// JSON editor configuration; missing fields take their defaults.
    #[arg(long, env = "LAYERFORGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Write the default template document.
    New {
        #[arg(long)]
        out: PathBuf,
    },
    /// Check that a document imports cleanly.
    Validate { file: PathBuf },
    /// Rasterize a document.
    Render {
        file: PathBuf,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
        #[arg(long, default_value = "png")]
        format: ExportFormat,
    },
    /// Print the pixel geometry of every layer as JSON.
    Elements { file: PathBuf },
    /// Report fonts the system cannot resolve.
    Fonts {
        file: PathBuf,
        /// Substitute the fallback font and save the document.
        #[arg(long)]
        write: bool,
    },
    /// Run an editing action on a selection and save the document.
    Apply {
        file: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        select: Vec<LayerId>,
        #[command(subcommand)]
        action: Action,
    },
    /// Work on the persisted working document.
    Session {
        /// Storage directory; defaults to the per-user data directory.
        #[arg(long, env = "LAYERFORGE_STORE")]
        store: Option<PathBuf>,
        #[command(subcommand)]
        command: SessionCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Replace the working document with an imported file.
    Open { file: PathBuf },
    /// Write the working document to a file.
    Export {
        #[arg(long)]
        out: PathBuf,
    },
    /// Run an editing action on the working document.
    Apply {
        #[arg(long, value_delimiter = ',', required = true)]
        select: Vec<LayerId>,
        #[command(subcommand)]
        action: Action,
    },
    /// List stored document keys.
    List,
    /// Remove the working document.
    Clear,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum Action {
    Align { edge: AlignEdge },
    Distribute { mode: DistributeMode },
    Group,
    Ungroup,
    Front,
    Back,
    Forward,
    Backward,
    Duplicate,
    Delete,
}

impl Action {
    fn name(self) -> &'static str {
        match self {
            Action::Align { .. } => "align",
            Action::Distribute { .. } => "distribute",
            Action::Group => "group",
            Action::Ungroup => "ungroup",
            Action::Front => "front",
            Action::Back => "back",
            Action::Forward => "forward",
            Action::Backward => "backward",
            Action::Duplicate => "duplicate",
            Action::Delete => "delete",
        }
    }
}

pub fn load_config(path: Option<&Path>) -> CliResult<EditorConfig> {
    let Some(path) = path else {
        return Ok(EditorConfig::default());
    };
    let json = read(path)?;
    EditorConfig::from_json(&json).map_err(CliError::Config)
}

fn read(path: &Path) -> CliResult<String> {
    fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write(path: &Path, data: impl AsRef<[u8]>) -> CliResult<()> {
    fs::write(path, data).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_document(path: &Path) -> CliResult<Document> {
    let doc = Document::from_json(&read(path)?)?;
    log::debug!("Loaded {} ({} layers)", path.display(), doc.layers.len());
    Ok(doc)
}

pub fn save_document(path: &Path, doc: &Document) -> CliResult<()> {
    write(path, doc.to_json()?)?;
    log::info!("Saved {}", path.display());
    Ok(())
}

pub fn open_storage(dir: Option<&Path>) -> CliResult<FileStorage> {
    let storage = match dir {
        Some(dir) => FileStorage::new(dir.to_path_buf())?,
        None => FileStorage::default_location()?,
    };
    log::debug!("Using storage at {}", storage.base_path().display());
    Ok(storage)
}

/// Run a session command against `storage`. Store mutations persist
/// through the store itself.
pub fn run_session(storage: FileStorage, config: &EditorConfig, command: SessionCommand) -> CliResult<()> {
    match command {
        SessionCommand::List => {
            for key in storage.list()? {
                println!("{}", key);
            }
        }
        SessionCommand::Clear => {
            if storage.exists(&config.storage_key)? {
                storage.delete(&config.storage_key)?;
                log::info!("Cleared working document");
            }
        }
        SessionCommand::Open { file } => {
            let json = read(&file)?;
            let mut store = Store::with_storage(Box::new(storage), config);
            store.import_json(&json)?;
            println!("{}: {} layers", file.display(), store.get().layers.len());
        }
        SessionCommand::Export { out } => {
            let store = Store::with_storage(Box::new(storage), config);
            save_document(&out, store.get())?;
        }
        SessionCommand::Apply { select, action } => {
            let mut store = Store::with_storage(Box::new(storage), config);
            let selection = apply_action(&mut store, config, &select, action)?;
            println!("{}", selection.join(","));
        }
    }
    Ok(())
}

/// Apply `action` to the layers named in `select`. Returns the ids that
/// make up the selection afterwards.
pub fn apply_action(
    store: &mut Store,
    config: &EditorConfig,
    select: &[LayerId],
    action: Action,
) -> CliResult<Vec<LayerId>> {
    for id in select {
        if store.layer(id).is_none() {
            return Err(CliError::UnknownLayer(id.clone()));
        }
    }
    store.select(select.to_vec());

    // Selection in stacking order, bottom first.
    let stacked: Vec<LayerId> = store
        .get()
        .layers
        .iter()
        .filter(|l| select.contains(&l.id))
        .map(|l| l.id.clone())
        .collect();

    let changed = match action {
        Action::Align { edge } => actions::align_selected(store, edge),
        Action::Distribute { mode } => actions::distribute_selected(store, mode),
        Action::Group => actions::group_selected(store).is_some(),
        Action::Ungroup => !actions::ungroup_selected(store).is_empty(),
        Action::Front => stacked
            .iter()
            .fold(false, |acc, id| actions::move_to_extreme(store, id, ZExtreme::Front) | acc),
        Action::Back => stacked
            .iter()
            .rev()
            .fold(false, |acc, id| actions::move_to_extreme(store, id, ZExtreme::Back) | acc),
        Action::Forward => stacked
            .iter()
            .rev()
            .fold(false, |acc, id| actions::move_layer(store, id, 1) | acc),
        Action::Backward => stacked
            .iter()
            .fold(false, |acc, id| actions::move_layer(store, id, -1) | acc),
        Action::Duplicate => !actions::duplicate_selected(store, config).is_empty(),
        Action::Delete => actions::delete_selected(store) > 0,
    };

    if !changed {
        return Err(CliError::NoChange(action.name()));
    }
    Ok(store.get().selected_ids().to_vec())
}

pub fn run(cli: Cli) -> CliResult<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::New { out } => {
            save_document(&out, &Document::default_template())?;
        }
        Command::Validate { file } => {
            let doc = load_document(&file)?;
            println!("{}: {} layers", file.display(), doc.layers.len());
        }
        Command::Render {
            file,
            out,
            scale,
            format,
        } => {
            let doc = load_document(&file)?;
            let fonts = FontBook::system();
            let mut renderer = Renderer::new();
            let bytes = export(&mut renderer, &doc, scale, format, &fonts)?;
            write(&out, bytes)?;
            log::info!("Wrote {}", out.display());
        }
        Command::Elements { file } => {
            let doc = load_document(&file)?;
            println!("{}", serde_json::to_string_pretty(&element_geometry(&doc))?);
        }
        Command::Fonts { file, write } => {
            let doc = load_document(&file)?;
            let fonts = FontBook::system();
            if write {
                let mut store = Store::new(doc, &config);
                let replaced = fonts.apply_fallback(&mut store, &config.fallback_font);
                if !replaced.is_empty() {
                    save_document(&file, store.get())?;
                }
                for font in replaced {
                    println!("{} -> {}", font, config.fallback_font);
                }
            } else {
                for font in fonts.missing_fonts(&doc) {
                    println!("{}", font);
                }
            }
        }
        Command::Apply {
            file,
            select,
            action,
        } => {
            let doc = load_document(&file)?;
            let mut store = Store::new(doc, &config);
            let selection = apply_action(&mut store, &config, &select, action)?;
            save_document(&file, store.get())?;
            println!("{}", selection.join(","));
        }
        Command::Session { store, command } => {
            let storage = open_storage(store.as_deref())?;
            run_session(storage, &config, command)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::{Point, Size};
    use layerforge_core::layers::{Layer, LayerContent, Transform, VectorContent};

    fn box_layer(name: &str, x: f64, y: f64) -> Layer {
        Layer::new(
            name,
            Transform::new(Point::new(x, y), Size::new(0.1, 0.1), 0.0),
            LayerContent::Vector(VectorContent::new(
                "<svg xmlns=\"http://www.w3.org/2000/svg\"/>",
                "#000000",
            )),
        )
    }

    fn sample() -> (Document, Vec<LayerId>) {
        let mut doc = Document::blank(1000.0, 1000.0);
        let a = box_layer("a", 0.2, 0.3);
        let b = box_layer("b", 0.6, 0.5);
        let ids = vec![a.id.clone(), b.id.clone()];
        doc.layers.push(a);
        doc.layers.push(b);
        (doc, ids)
    }

    #[test]
    fn test_cli_parses_apply() {
        let cli = Cli::try_parse_from([
            "layerforge", "apply", "doc.json", "--select", "a,b", "align", "left",
        ])
        .unwrap();
        match cli.command {
            Command::Apply { select, action, .. } => {
                assert_eq!(select, vec!["a".to_string(), "b".to_string()]);
                assert!(matches!(action, Action::Align { edge: AlignEdge::Left }));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        assert!(
            Cli::try_parse_from(["layerforge", "apply", "d.json", "--select", "a", "distribute", "diagonal"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["layerforge", "render", "d.json", "--out", "o.jpg", "--format", "jpeg"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Command::Render { format: ExportFormat::Jpeg, scale, .. } if scale == 1.0
        ));
    }

    #[test]
    fn test_align_left_moves_both_layers() {
        let (doc, ids) = sample();
        let config = EditorConfig::default();
        let mut store = Store::new(doc, &config);

        let selection = apply_action(&mut store, &config, &ids, Action::Align { edge: AlignEdge::Left }).unwrap();
        assert_eq!(selection, ids);
        let xs: Vec<f64> = ids
            .iter()
            .map(|id| store.layer(id).unwrap().transform.position.x)
            .collect();
        assert!((xs[0] - xs[1]).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_layer_is_error() {
        let (doc, _) = sample();
        let config = EditorConfig::default();
        let mut store = Store::new(doc, &config);
        let result = apply_action(&mut store, &config, &["missing".to_string()], Action::Delete);
        assert!(matches!(result, Err(CliError::UnknownLayer(id)) if id == "missing"));
    }

    #[test]
    fn test_back_keeps_relative_order() {
        let (mut doc, ids) = sample();
        let c = box_layer("c", 0.5, 0.5);
        let c_id = c.id.clone();
        doc.layers.push(c);
        let config = EditorConfig::default();
        let mut store = Store::new(doc, &config);

        apply_action(&mut store, &config, &[ids[1].clone(), c_id.clone()], Action::Back).unwrap();
        let order: Vec<&str> = store.get().layers.iter().skip(1).map(|l| l.id.as_str()).collect();
        assert_eq!(order, vec![ids[1].as_str(), c_id.as_str(), ids[0].as_str()]);
    }

    #[test]
    fn test_forward_at_top_changes_nothing() {
        let (doc, ids) = sample();
        let config = EditorConfig::default();
        let mut store = Store::new(doc, &config);
        let result = apply_action(&mut store, &config, &ids[1..], Action::Forward);
        assert!(matches!(result, Err(CliError::NoChange("forward"))));
    }

    #[test]
    fn test_apply_and_save_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("doc.json");
        let (doc, ids) = sample();
        save_document(&path, &doc).unwrap();

        let cli = Cli {
            config: None,
            command: Command::Apply {
                file: path.clone(),
                select: ids.clone(),
                action: Action::Delete,
            },
        };
        run(cli).unwrap();

        let saved = load_document(&path).unwrap();
        assert_eq!(saved.layers.len(), 1);
        assert!(saved.layers[0].is_background());
    }

    #[test]
    fn test_new_writes_valid_template() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.json");
        run(Cli {
            config: None,
            command: Command::New { out: path.clone() },
        })
        .unwrap();
        let doc = load_document(&path).unwrap();
        assert_eq!(doc.layers.len(), Document::default_template().layers.len());
    }

    #[test]
    fn test_session_persists_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let doc_path = dir.path().join("doc.json");
        let store_dir = dir.path().join("store");
        let (doc, ids) = sample();
        save_document(&doc_path, &doc).unwrap();
        let config = EditorConfig::default();

        let storage = open_storage(Some(&store_dir)).unwrap();
        run_session(storage, &config, SessionCommand::Open { file: doc_path }).unwrap();
        let storage = open_storage(Some(&store_dir)).unwrap();
        assert_eq!(storage.list().unwrap(), vec![config.storage_key.clone()]);

        let command = SessionCommand::Apply {
            select: vec![ids[1].clone()],
            action: Action::Delete,
        };
        run_session(storage, &config, command).unwrap();

        let out = dir.path().join("out.json");
        let storage = open_storage(Some(&store_dir)).unwrap();
        run_session(storage, &config, SessionCommand::Export { out: out.clone() }).unwrap();
        let exported = load_document(&out).unwrap();
        assert_eq!(exported.layers.len(), 2);
        assert!(exported.layer(&ids[0]).is_some());
        assert!(exported.layer(&ids[1]).is_none());

        let storage = open_storage(Some(&store_dir)).unwrap();
        run_session(storage, &config, SessionCommand::Clear).unwrap();
        let storage = open_storage(Some(&store_dir)).unwrap();
        assert!(!storage.exists(&config.storage_key).unwrap());
    }

    #[test]
    fn test_session_starts_from_template() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out.json");
        let storage = open_storage(Some(dir.path())).unwrap();
        run_session(storage, &EditorConfig::default(), SessionCommand::Export { out: out.clone() }).unwrap();
        let exported = load_document(&out).unwrap();
        assert_eq!(exported.layers.len(), Document::default_template().layers.len());
    }

    #[test]
    fn test_cli_parses_session() {
        let cli = Cli::try_parse_from([
            "layerforge", "session", "--store", "/tmp/lf", "apply", "--select", "a", "front",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Session { store: Some(_), command: SessionCommand::Apply { action: Action::Front, .. } }
        ));
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "fallback_font": "Helvetica" }"#).unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.fallback_font, "Helvetica");
        assert_eq!(config.history_capacity, EditorConfig::default().history_capacity);

        fs::write(&path, "not json").unwrap();
        assert!(matches!(load_config(Some(&path)), Err(CliError::Config(_))));
        assert!(matches!(
            load_config(Some(&dir.path().join("missing.json"))),
            Err(CliError::Io { .. })
        ));
    }
}
