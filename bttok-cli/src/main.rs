use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};

use bttok::charvec::CharVectors;
use bttok::export::to_cpp;
use bttok::extractor::{check, with_output, Extractor};
use bttok::get_version;
use bttok::index::{CharKey, FeatureIndex, TokenKey};
use bttok::lexicon::PosLexicon;
use bttok::parts::{parts_padding, PartsVectorizer, PartsWindow};
use bttok::scorer::LightGbmScorer;
use bttok::segmenter::Segmenter;
use bttok::tagger::MecabTagger;
use bttok::window::{Padding, Preset, WindowConfig};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PresetArg {
    /// Width 8, boundary after offset 3
    Wakati,
    /// Width 10, boundary after offset 4
    WakatiWide,
}

impl From<PresetArg> for Preset {
    fn from(preset: PresetArg) -> Self {
        match preset {
            PresetArg::Wakati => Preset::Wakati,
            PresetArg::WakatiWide => Preset::WakatiWide,
        }
    }
}

#[derive(Debug, Args)]
struct WindowArgs {
    #[arg(long, value_enum, default_value = "wakati")]
    preset: PresetArg,

    /// JSON window configuration; overrides --preset
    #[arg(long)]
    window_config: Option<PathBuf>,
}

impl WindowArgs {
    fn config(&self) -> Result<WindowConfig, Box<dyn Error>> {
        match &self.window_config {
            Some(path) => Ok(WindowConfig::load(path.as_path())?),
            None => Ok(WindowConfig::from_preset(self.preset.into())),
        }
    }
}

#[derive(Debug, Args)]
struct TaggerArgs {
    #[arg(long, default_value = "mecab")]
    mecab: String,

    /// Extra argument passed to every mecab invocation (repeatable)
    #[arg(long = "mecab-arg", allow_hyphen_values = true)]
    mecab_args: Vec<String>,
}

impl TaggerArgs {
    fn tagger(&self) -> MecabTagger {
        MecabTagger::new(self.mecab.as_str()).with_args(self.mecab_args.iter().cloned())
    }
}

#[derive(Debug, Args)]
struct PartsWindowArgs {
    #[arg(long, default_value = "4")]
    head_len: usize,

    #[arg(long, default_value = "1")]
    tail_skip: usize,

    #[arg(long, default_value = "4")]
    tail_len: usize,
}

impl From<&PartsWindowArgs> for PartsWindow {
    fn from(args: &PartsWindowArgs) -> Self {
        PartsWindow {
            head_len: args.head_len,
            tail_skip: args.tail_skip,
            tail_len: args.tail_len,
        }
    }
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Print every review as space separated characters",
    version = get_version(),
)]
struct CharArrayArgs {
    #[arg(default_value = "reviews.json")]
    reviews_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Convert fastText character vectors to JSON",
    version = get_version(),
)]
struct CharVecArgs {
    #[arg(default_value = "model.vec")]
    vec_file: PathBuf,

    #[arg(default_value = "char_vec.json")]
    output_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Generate the labeled character dataset from a review corpus",
    version = get_version(),
)]
struct MakeDataArgs {
    #[command(flatten)]
    tagger: TaggerArgs,

    #[arg(default_value = "reviews.json")]
    reviews_file: PathBuf,

    #[arg(default_value = "dataset_raw.txt")]
    dataset_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Build the (offset, character) index of a labeled dataset",
    version = get_version(),
)]
struct MakeIndexArgs {
    #[arg(default_value = "dataset_raw.txt")]
    dataset_file: PathBuf,

    #[arg(default_value = "idf_index.json")]
    index_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Write sparse training rows for a labeled dataset",
    version = get_version(),
)]
struct MakeSparseArgs {
    #[arg(short = 'n', long, default_value = "1")]
    num_threads: usize,

    #[arg(default_value = "dataset_raw.txt")]
    dataset_file: PathBuf,

    #[arg(default_value = "idf_index.json")]
    index_file: PathBuf,

    #[arg(default_value = "dataset.txt")]
    sparse_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Generate the part-of-speech dataset from a review corpus",
    version = get_version(),
)]
struct MakePartsDataArgs {
    #[command(flatten)]
    tagger: TaggerArgs,

    #[command(flatten)]
    window: PartsWindowArgs,

    /// Do not add sentinel padding around each review
    #[arg(long)]
    no_padding: bool,

    #[arg(default_value = "reviews.json")]
    reviews_file: PathBuf,

    #[arg(default_value = "dataset_parts_raw.txt")]
    dataset_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Build the term and tag indexes of a part-of-speech dataset",
    version = get_version(),
)]
struct MakePartsIndexArgs {
    #[command(flatten)]
    window: PartsWindowArgs,

    #[arg(default_value = "dataset_parts_raw.txt")]
    dataset_file: PathBuf,

    #[arg(default_value = "aterm_index.json")]
    term_index_file: PathBuf,

    #[arg(default_value = "parts_index.json")]
    tag_index_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Write sparse training rows for a part-of-speech dataset",
    version = get_version(),
)]
struct MakePartsSparseArgs {
    #[arg(short = 'n', long, default_value = "1")]
    num_threads: usize,

    #[command(flatten)]
    window: PartsWindowArgs,

    #[arg(default_value = "dataset_parts_raw.txt")]
    dataset_file: PathBuf,

    #[arg(default_value = "aterm_index.json")]
    term_index_file: PathBuf,

    #[arg(default_value = "parts_index.json")]
    tag_index_file: PathBuf,

    #[arg(default_value = "dataset_parts.txt")]
    sparse_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Build the (ordinal, surface) part-of-speech lexicon",
    version = get_version(),
)]
struct MakeLexiconArgs {
    #[command(flatten)]
    tagger: TaggerArgs,

    #[arg(default_value = "reviews.json")]
    reviews_file: PathBuf,

    #[arg(default_value = "pos_lexicon.json")]
    lexicon_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Export a character index as a C++ map literal",
    version = get_version(),
)]
struct ExportCppArgs {
    #[arg(long, default_value = "idf_index")]
    name: String,

    #[arg(short, long, default_value = "idf_index.cpp")]
    output_file: PathBuf,

    #[arg(default_value = "idf_index.json")]
    index_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Segment every review with a LightGBM model",
    version = get_version(),
)]
struct PredictArgs {
    #[command(flatten)]
    window: WindowArgs,

    #[arg(long, default_value = "lightgbm")]
    lightgbm: String,

    #[arg(long, default_value = "predict.conf")]
    predict_config: PathBuf,

    /// Directory receiving the per-review .data and .orig files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// File the scorer input is written to before each prediction
    #[arg(long, default_value = "predict.data")]
    scorer_input: PathBuf,

    #[arg(long, default_value = "prediction.txt")]
    prediction_file: PathBuf,

    /// Part-of-speech lexicon; prints a tagged line after each review
    #[arg(short, long)]
    lexicon: Option<PathBuf>,

    #[arg(default_value = "reviews.json")]
    reviews_file: PathBuf,

    #[arg(default_value = "idf_index.json")]
    index_file: PathBuf,
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Print predictions next to the rows they were made for",
    version = get_version(),
)]
struct CheckArgs {
    #[arg(default_value = "prediction.txt")]
    prediction_file: PathBuf,

    #[arg(default_value = "test")]
    rows_file: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    CharArray(CharArrayArgs),
    CharVec(CharVecArgs),
    MakeData(MakeDataArgs),
    MakeIndex(MakeIndexArgs),
    MakeSparse(MakeSparseArgs),
    MakePartsData(MakePartsDataArgs),
    MakePartsIndex(MakePartsIndexArgs),
    MakePartsSparse(MakePartsSparseArgs),
    MakeLexicon(MakeLexiconArgs),
    ExportCpp(ExportCppArgs),
    Predict(PredictArgs),
    Check(CheckArgs),
}

#[derive(Debug, Parser)]
#[clap(
    name = "bttok",
    author,
    about = "Feature builder and boundary reconstructor for boosting-tree word segmentation",
    version = get_version(),
)]
struct CommandArgs {
    #[clap(subcommand)]
    command: Commands,
}

/// Clears the returned flag on the first Ctrl-C and exits on the second.
fn running_flag() -> Result<Arc<AtomicBool>, Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        if r.load(Ordering::SeqCst) {
            r.store(false, Ordering::SeqCst);
        } else {
            std::process::exit(0);
        }
    })?;

    Ok(running)
}

fn extractor(num_threads: usize) -> Result<Extractor, Box<dyn Error>> {
    Ok(Extractor::new(running_flag()?, num_threads)?)
}

fn char_array(args: CharArrayArgs) -> Result<(), Box<dyn Error>> {
    let extractor = extractor(1)?;
    with_output(None, |out| extractor.char_array(args.reviews_file.as_path(), out))?;
    Ok(())
}

fn char_vec(args: CharVecArgs) -> Result<(), Box<dyn Error>> {
    let vectors = CharVectors::load_vec(args.vec_file.as_path())?;
    vectors.save(args.output_file.as_path())?;

    println!("{} character vectors written.", vectors.len());
    Ok(())
}

fn make_data(args: MakeDataArgs) -> Result<(), Box<dyn Error>> {
    let mut tagger = args.tagger.tagger();
    let written = extractor(1)?.make_data(
        args.reviews_file.as_path(),
        &mut tagger,
        args.dataset_file.as_path(),
    )?;

    println!("{} labeled windows written.", written);
    Ok(())
}

fn make_index(args: MakeIndexArgs) -> Result<(), Box<dyn Error>> {
    let index = extractor(1)?.make_index(args.dataset_file.as_path())?;
    index.save(args.index_file.as_path())?;

    println!("Index of {} features written.", index.len());
    Ok(())
}

fn make_sparse(args: MakeSparseArgs) -> Result<(), Box<dyn Error>> {
    let index = FeatureIndex::<CharKey>::load(args.index_file.as_path())?;
    let written = extractor(args.num_threads)?.make_sparse(
        args.dataset_file.as_path(),
        &index,
        args.sparse_file.as_path(),
    )?;

    println!("{} sparse rows written.", written);
    Ok(())
}

fn make_parts_data(args: MakePartsDataArgs) -> Result<(), Box<dyn Error>> {
    let mut tagger = args.tagger.tagger();
    let padding = if args.no_padding {
        Padding {
            left: String::new(),
            right: String::new(),
        }
    } else {
        parts_padding()
    };
    let written = extractor(1)?.make_parts_data(
        args.reviews_file.as_path(),
        &mut tagger,
        &PartsWindow::from(&args.window),
        &padding,
        args.dataset_file.as_path(),
    )?;

    println!("{} part-of-speech rows written.", written);
    Ok(())
}

fn make_parts_index(args: MakePartsIndexArgs) -> Result<(), Box<dyn Error>> {
    let window = PartsWindow::from(&args.window);
    let vectorizer = extractor(1)?.make_parts_index(args.dataset_file.as_path(), &window)?;
    vectorizer.terms.save(args.term_index_file.as_path())?;
    vectorizer.tags.save(args.tag_index_file.as_path())?;

    println!(
        "Indexes of {} terms and {} tags written.",
        vectorizer.terms.len(),
        vectorizer.tags.len()
    );
    Ok(())
}

fn make_parts_sparse(args: MakePartsSparseArgs) -> Result<(), Box<dyn Error>> {
    let vectorizer = PartsVectorizer {
        terms: FeatureIndex::<TokenKey>::load(args.term_index_file.as_path())?,
        tags: FeatureIndex::<String>::load(args.tag_index_file.as_path())?,
    };
    let written = extractor(args.num_threads)?.make_parts_sparse(
        args.dataset_file.as_path(),
        &vectorizer,
        &PartsWindow::from(&args.window),
        args.sparse_file.as_path(),
    )?;

    println!("{} sparse rows written.", written);
    Ok(())
}

fn make_lexicon(args: MakeLexiconArgs) -> Result<(), Box<dyn Error>> {
    let mut tagger = args.tagger.tagger();
    let lexicon = extractor(1)?.make_lexicon(args.reviews_file.as_path(), &mut tagger)?;
    lexicon.save(args.lexicon_file.as_path())?;

    println!("Lexicon of {} entries written.", lexicon.len());
    Ok(())
}

fn export_cpp(args: ExportCppArgs) -> Result<(), Box<dyn Error>> {
    let index = FeatureIndex::<CharKey>::load(args.index_file.as_path())?;
    let source = to_cpp(&index, &args.name);

    fs::write(args.output_file.as_path(), &source)?;
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    writer.write_all(source.as_bytes())?;
    writer.flush()?;
    Ok(())
}

fn predict(args: PredictArgs) -> Result<(), Box<dyn Error>> {
    let config = args.window.config()?;
    let index = FeatureIndex::<CharKey>::load(args.index_file.as_path())?;
    let lexicon = match &args.lexicon {
        Some(path) => Some(PosLexicon::load(path.as_path())?),
        None => None,
    };

    let scorer = LightGbmScorer::new(
        args.lightgbm.as_str(),
        args.predict_config.as_path(),
        args.scorer_input.as_path(),
        args.prediction_file.as_path(),
    );
    let mut segmenter = Segmenter::new(index, config, scorer);

    let extractor = extractor(1)?;
    with_output(None, |out| {
        extractor.predict(
            args.reviews_file.as_path(),
            &mut segmenter,
            args.data_dir.as_path(),
            lexicon.as_ref(),
            out,
        )
    })?;
    Ok(())
}

fn check_predictions(args: CheckArgs) -> Result<(), Box<dyn Error>> {
    with_output(None, |out| {
        check(args.prediction_file.as_path(), args.rows_file.as_path(), out)
    })?;
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = CommandArgs::parse();

    match args.command {
        Commands::CharArray(args) => char_array(args),
        Commands::CharVec(args) => char_vec(args),
        Commands::MakeData(args) => make_data(args),
        Commands::MakeIndex(args) => make_index(args),
        Commands::MakeSparse(args) => make_sparse(args),
        Commands::MakePartsData(args) => make_parts_data(args),
        Commands::MakePartsIndex(args) => make_parts_index(args),
        Commands::MakePartsSparse(args) => make_parts_sparse(args),
        Commands::MakeLexicon(args) => make_lexicon(args),
        Commands::ExportCpp(args) => export_cpp(args),
        Commands::Predict(args) => predict(args),
        Commands::Check(args) => check_predictions(args),
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
