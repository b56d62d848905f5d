use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use epubforge::epub::config::DEFAULT_CONFIG_PATH;
use epubforge::{Book, ContentNode, EpubConfig, EpubReader, TocTree, TocTreeStyle};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

type CliResult<T> = std::result::Result<T, Box<dyn Error>>;

/// 📚 epubforge - EPUB解析工具
#[derive(Parser)]
#[command(name = "epubforge")]
#[command(about = "把EPUB文件解析为书籍模型和内容节点")]
#[command(version)]
struct Args {
    /// EPUB文件路径
    #[arg(help = "要处理的EPUB文件路径")]
    epub_file: PathBuf,

    /// 详细输出模式
    #[arg(short, long, help = "显示详细信息并输出debug日志")]
    verbose: bool,

    /// 显示元数据信息
    #[arg(short, long, help = "显示EPUB元数据信息")]
    metadata: bool,

    /// 显示目录树
    #[arg(short, long, help = "显示EPUB目录树结构")]
    toc: bool,

    /// 显示阅读顺序
    #[arg(short, long, help = "显示脊柱（阅读顺序）")]
    spine: bool,

    /// 显示指定章节内容
    #[arg(short, long, help = "显示指定章节的内容（使用脊柱索引，从1开始）")]
    chapter: Option<usize>,

    /// 输出格式
    #[arg(long, value_enum, default_value = "text", help = "输出格式")]
    format: OutputFormat,

    /// 章节内容最大显示长度
    #[arg(long, default_value = "2000", help = "章节文本最大显示字符数（0表示不限制）")]
    max_length: usize,

    /// 配置文件路径
    #[arg(long, help = "YAML配置文件路径（默认读取当前目录的epubforge.yaml）")]
    config: Option<PathBuf>,

    /// 解压目录
    #[arg(long, help = "解压根目录，覆盖配置文件中的设置")]
    extract_dir: Option<PathBuf>,

    /// 生成默认配置文件
    #[arg(long, help = "在配置文件路径生成默认配置后退出")]
    init_config: bool,
}

/// 输出格式
#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq)]
enum OutputFormat {
    /// 可读文本
    Text,
    /// YAML结构
    Yaml,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("❌ 错误: {}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "epubforge=debug" } else { "epubforge=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: &Args) -> CliResult<()> {
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    if args.init_config {
        EpubConfig::generate_default_config(&config_path)?;
        println!("✅ 已生成默认配置文件: {}", config_path.display());
        return Ok(());
    }

    let mut config = match &args.config {
        Some(path) => EpubConfig::from_file(path)?,
        None => EpubConfig::load_or_default(&config_path),
    };
    if let Some(dir) = &args.extract_dir {
        config.archive.extraction_root = dir.clone();
    }

    let reader = EpubReader::with_config(config);
    let book = reader.read_epub(&args.epub_file)?;

    display_summary(&book, args.verbose);

    if args.metadata {
        display_metadata(&book, args.format)?;
    }

    if args.toc {
        display_table_of_contents(&book, args.verbose, args.format)?;
    }

    if args.spine {
        display_spine(&book, args.format)?;
    }

    if let Some(index) = args.chapter {
        display_chapter(&reader, &book, index, args.format, args.max_length)?;
    }

    Ok(())
}

fn to_yaml<T: Serialize>(value: &T) -> CliResult<String> {
    Ok(serde_yml::to_string(value)?)
}

/// 显示书籍概要
fn display_summary(book: &Book, verbose: bool) {
    println!("📚 {} (EPUB {})", book.title(), book.version);
    println!("  📁 清单项: {}", book.manifest.len());
    println!("  📖 脊柱项: {}", book.chapters().len());
    println!("  🌳 {}", book.toc_statistics());

    match &book.cover_image {
        Some(cover) => println!("  🖼️  封面: {}", cover.href),
        None => println!("  🖼️  封面: 无"),
    }

    if verbose {
        println!("  📂 资源目录: {}", book.resource_base.display());
        println!("  🎨 样式表: {} 字节", book.css_string.len());
    }

    if !book.warnings.is_empty() {
        println!("  ⚠️  警告:");
        for warning in &book.warnings {
            println!("    - {}", warning);
        }
    }
}

/// 显示元数据信息
fn display_metadata(book: &Book, format: OutputFormat) -> CliResult<()> {
    let Some(metadata) = &book.metadata else {
        println!("\n📊 没有元数据");
        return Ok(());
    };

    if format == OutputFormat::Yaml {
        println!("{}", to_yaml(metadata)?);
        return Ok(());
    }

    println!("\n📊 EPUB元数据信息:");
    if let Some(title) = metadata.title() {
        println!("    标题: {}", title);
    }

    if !metadata.creators.is_empty() {
        println!("    作者:");
        for (i, creator) in metadata.creators.iter().enumerate() {
            let mut author_info = format!("      {}. {}", i + 1, creator.name);
            if let Some(role) = &creator.role {
                author_info.push_str(&format!(" ({})", role));
            }
            if let Some(file_as) = &creator.file_as {
                author_info.push_str(&format!(" [排序: {}]", file_as));
            }
            println!("{}", author_info);
        }
    }

    println!("    语言: {}", metadata.language);

    for identifier in &metadata.identifiers {
        match &identifier.scheme {
            Some(scheme) => println!("    标识符 ({}): {}", scheme, identifier.value),
            None => println!("    标识符: {}", identifier.value),
        }
    }

    for date in &metadata.dates {
        match &date.event {
            Some(event) => println!("    日期 ({}): {}", event, date.date),
            None => println!("    日期: {}", date.date),
        }
    }

    let lists = [
        ("出版社", &metadata.publishers),
        ("主题", &metadata.subjects),
        ("版权", &metadata.rights),
        ("来源", &metadata.sources),
    ];
    for (label, values) in lists {
        if !values.is_empty() {
            println!("    {}: {}", label, values.join(", "));
        }
    }

    for description in &metadata.descriptions {
        println!("    描述: {}", description);
    }

    if !metadata.meta_attributes.is_empty() {
        println!("    meta: {} 项", metadata.meta_attributes.len());
    }

    Ok(())
}

/// 显示目录树
fn display_table_of_contents(book: &Book, verbose: bool, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Yaml {
        println!("{}", to_yaml(&book.table_of_contents)?);
        return Ok(());
    }

    println!("\n🌳 目录树:");
    if book.table_of_contents.is_empty() {
        println!("  (无目录)");
        return Ok(());
    }

    let mut toc_tree = TocTree::new(&book.table_of_contents)
        .with_title(book.toc_title.as_deref())
        .with_style(TocTreeStyle::TreeSymbols);

    if verbose {
        toc_tree = toc_tree.with_show_paths(true);
    } else {
        toc_tree = toc_tree.with_show_paths(false).with_max_depth(Some(3));
    }

    println!("{}", toc_tree);
    Ok(())
}

/// 显示阅读顺序
fn display_spine(book: &Book, format: OutputFormat) -> CliResult<()> {
    if format == OutputFormat::Yaml {
        println!("{}", to_yaml(&book.spine)?);
        return Ok(());
    }

    println!("\n📖 阅读顺序:");
    let Some(spine) = &book.spine else {
        println!("  (无脊柱)");
        return Ok(());
    };

    for (i, reference) in spine.iter().enumerate() {
        let linear = if reference.linear { "" } else { " [非线性]" };
        println!(
            "  {}. {} → {}{}",
            i + 1,
            reference.resource.id,
            reference.resource.href,
            linear
        );
    }
    Ok(())
}

/// 显示章节内容
fn display_chapter(
    reader: &EpubReader,
    book: &Book,
    index: usize,
    format: OutputFormat,
    max_length: usize,
) -> CliResult<()> {
    let chapters = book.chapters();
    let resource = index
        .checked_sub(1)
        .and_then(|i| chapters.get(i))
        .ok_or_else(|| format!("章节索引 {} 超出范围 (共 {} 章)", index, chapters.len()))?;

    let chapter = reader.try_parse_chapter(book, resource)?;

    if format == OutputFormat::Yaml {
        println!("{}", to_yaml(&chapter)?);
        return Ok(());
    }

    println!(
        "\n📖 第 {} 章: {} ({})",
        index,
        chapter.title.as_deref().unwrap_or("无标题"),
        resource.href
    );

    let mut output = String::new();
    for node in &chapter.nodes {
        render_node(node, 0, &mut output);
    }

    if max_length > 0 && output.chars().count() > max_length {
        let truncated: String = output.chars().take(max_length).collect();
        println!("{}\n... (已截断，共 {} 字符)", truncated, output.chars().count());
    } else {
        println!("{}", output);
    }
    Ok(())
}

/// 把节点渲染为缩进文本
fn render_node(node: &ContentNode, indent: usize, output: &mut String) {
    let pad = "  ".repeat(indent);
    match node {
        ContentNode::Heading { level, text, .. } => {
            output.push_str(&format!("{}{} {}\n", pad, "#".repeat(level.level() as usize), text));
        }
        ContentNode::List { ordered, items } => {
            for (i, item) in items.iter().enumerate() {
                let marker = if *ordered { format!("{}.", i + 1) } else { "-".to_string() };
                output.push_str(&format!("{}{} {}\n", pad, marker, item.plain_text()));
            }
        }
        ContentNode::Image { src, alt, .. } => {
            output.push_str(&format!("{}[图片: {}]\n", pad, alt.as_deref().unwrap_or(src)));
        }
        ContentNode::Div { children, .. } | ContentNode::Fieldset { children } => {
            for child in children {
                render_node(child, indent + 1, output);
            }
        }
        ContentNode::LineBreak => output.push('\n'),
        other => {
            let text = other.plain_text();
            if !text.trim().is_empty() {
                output.push_str(&format!("{}{}\n", pad, text));
            }
        }
    }
}
