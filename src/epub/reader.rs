//! EPUB读取器
//!
//! 把各个解析阶段串起来：解压 → container.xml → OPF → 目录 → [`Book`]。
//! 章节内容在需要时按资源单独解析。

use std::fs;
use std::path::Path;

use crate::epub::archive;
use crate::epub::book::Book;
use crate::epub::config::EpubConfig;
use crate::epub::container::{Container, OPF_MEDIA_TYPE};
use crate::epub::content::{Chapter, ChapterContext, ContentNode, check_well_formed};
use crate::epub::css::Stylesheet;
use crate::epub::error::{EpubError, ParseWarning, Result};
use crate::epub::media_type::XHTML;
use crate::epub::opf::PackageDocument;
use crate::epub::resource::EpubResource;
use crate::epub::toc::build_table_of_contents;

/// EPUB读取器
///
/// 读取器本身只持有配置，解析章节时只读访问 [`Book`]，
/// 因此同一本书的多个章节可以在不同线程中并行解析。
#[derive(Debug, Clone, Default)]
pub struct EpubReader {
    config: EpubConfig,
}

impl EpubReader {
    /// 使用默认配置创建读取器
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定配置创建读取器
    pub fn with_config(config: EpubConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EpubConfig {
        &self.config
    }

    /// 读取EPUB文件，解压到配置的解压根目录下以文件名命名的子目录
    ///
    /// # 参数
    /// * `path` - epub文件路径
    ///
    /// # 返回值
    /// * `Result<Book>` - 路径无效时返回 `InvalidPath`，压缩包损坏时返回 `BookNotAvailable`
    pub fn read_epub<P: AsRef<Path>>(&self, path: P) -> Result<Book> {
        let path = path.as_ref();
        let dest_dir = archive::extraction_dir_for(&self.config.archive.extraction_root, path);
        self.read_epub_into(path, dest_dir)
    }

    /// 读取EPUB文件，解压到指定目录
    ///
    /// 目标目录中已经有解压结果时不会重新解压。
    pub fn read_epub_into<P: AsRef<Path>, Q: AsRef<Path>>(&self, path: P, dest_dir: Q) -> Result<Book> {
        let path = path.as_ref();
        tracing::info!("读取EPUB: {}", path.display());

        let root_dir = archive::extract(path, dest_dir)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        self.read_extracted(root_dir, &name)
    }

    /// 读取已经解压好的EPUB目录
    ///
    /// # 参数
    /// * `root_dir` - 解压根目录（包含 `META-INF`）
    /// * `name` - 书名标识
    pub fn read_extracted<P: AsRef<Path>>(&self, root_dir: P, name: &str) -> Result<Book> {
        let root_dir = root_dir.as_ref();
        let location = Container::locate_package(root_dir)?;

        let opf_content = fs::read_to_string(&location.opf_path).map_err(|e| {
            EpubError::BookNotAvailable(format!("无法读取OPF文件 {}: {}", location.opf_path.display(), e))
        })?;
        let package = PackageDocument::parse(
            &opf_content,
            &location.resource_base,
            root_dir,
            &self.config.metadata,
        )?;
        tracing::info!(
            "OPF解析完成: 版本 {}, {} 个清单项, {} 个脊柱项",
            package.version,
            package.manifest.len(),
            package.spine.as_ref().map(|s| s.len()).unwrap_or(0)
        );

        let mut warnings = package.warnings.clone();
        let css_string = read_stylesheet(&package, &mut warnings);

        let toc = build_table_of_contents(package.toc_resource.as_ref(), &package.manifest);
        if let Some(warning) = toc.warning {
            warnings.push(warning);
        }

        let opf_resource = EpubResource::new(
            "opf".to_string(),
            location.opf_href.clone(),
            OPF_MEDIA_TYPE,
            None,
            root_dir,
        );

        let book = Book {
            opf_resource,
            toc_resource: package.toc_resource,
            name: name.to_string(),
            version: package.version,
            manifest: package.manifest,
            metadata: package.metadata,
            spine: package.spine,
            cover_image: package.cover_image,
            css_string,
            table_of_contents: toc.references,
            resource_base: location.resource_base,
            toc_title: toc.title,
            guide: package.guide,
            warnings,
        };

        tracing::info!(
            "书籍加载完成: {} ({} 个目录项, {} 条警告)",
            book.title(),
            book.toc_statistics().total_nodes,
            book.warnings.len()
        );
        Ok(book)
    }

    /// 解析一个章节为内容节点
    ///
    /// 章节无法读取或格式错误时记录警告并返回空列表，不影响其他章节。
    pub fn parse_chapter(&self, book: &Book, resource: &EpubResource) -> Vec<ContentNode> {
        match self.try_parse_chapter(book, resource) {
            Ok(chapter) => chapter.nodes,
            Err(e) => {
                tracing::warn!("章节 {} 解析失败: {}", resource.href, e);
                Vec::new()
            }
        }
    }

    /// 解析一个章节，失败时返回 `ChapterParseError`
    pub fn try_parse_chapter(&self, book: &Book, resource: &EpubResource) -> Result<Chapter> {
        let content = fs::read_to_string(&resource.full_href).map_err(|e| {
            EpubError::ChapterParseError(format!("无法读取 {}: {}", resource.full_href.display(), e))
        })?;

        if resource.media_type == *XHTML {
            check_well_formed(&content)?;
        }

        let stylesheet = Stylesheet::parse(&book.css_string);
        let context = ChapterContext {
            manifest: &book.manifest,
            resource_base: &book.resource_base,
            stylesheet: &stylesheet,
            style_config: &self.config.style,
            document_href: &resource.href,
        };
        let (title, nodes) = context.transform_document(&content);
        tracing::debug!("章节 {} 解析完成: {} 个节点", resource.href, nodes.len());

        Ok(Chapter {
            id: resource.id.clone(),
            title,
            nodes,
        })
    }

    /// 按阅读顺序解析所有章节，每个章节的结果相互独立
    pub fn parse_spine(&self, book: &Book) -> Vec<Result<Chapter>> {
        book.chapters()
            .into_iter()
            .map(|resource| self.try_parse_chapter(book, resource))
            .collect()
    }
}

/// 读取样式表原文，没有样式表时为空字符串，读取失败时记录警告
fn read_stylesheet(package: &PackageDocument, warnings: &mut Vec<ParseWarning>) -> String {
    let Some(resource) = package.stylesheet() else {
        return String::new();
    };

    match fs::read_to_string(&resource.full_href) {
        Ok(css) => {
            tracing::debug!("样式表: {} ({} 字节)", resource.href, css.len());
            css
        }
        Err(e) => {
            tracing::warn!("无法读取样式表 {}: {}", resource.href, e);
            warnings.push(ParseWarning::StylesheetUnavailable {
                href: resource.href.clone(),
                reason: e.to_string(),
            });
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::epub::content::{Align, HeadingLevel};
    use pretty_assertions::assert_eq;
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use zip::ZipWriter;
    use zip::write::FileOptions;

    const CONTAINER_XML: &str = r#"<?xml version="1.0"?>
<container version="1.0" xmlns="urn:oasis:names:tc:opendocument:xmlns:container">
    <rootfiles>
        <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
    </rootfiles>
</container>"#;

    const EPUB2_OPF: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="2.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="BookId">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:opf="http://www.idpf.org/2007/opf">
        <dc:title>测试书籍</dc:title>
        <dc:creator opf:role="aut">测试作者</dc:creator>
        <dc:language>zh-CN</dc:language>
        <dc:identifier id="BookId" opf:scheme="ISBN">978-1234567890</dc:identifier>
    </metadata>
    <manifest>
        <item id="ncx" href="toc.ncx" media-type="application/x-dtbncx+xml"/>
        <item id="style" href="Styles/style.css" media-type="text/css"/>
        <item id="chapter1" href="Text/chapter1.xhtml" media-type="application/xhtml+xml"/>
        <item id="chapter2" href="Text/chapter2.xhtml" media-type="application/xhtml+xml"/>
        <item id="chapter3" href="Text/chapter3.xhtml" media-type="application/xhtml+xml"/>
        <item id="chapter4" href="Text/chapter4.xhtml" media-type="application/xhtml+xml"/>
    </manifest>
    <spine toc="ncx">
        <itemref idref="chapter1"/>
        <itemref idref="chapter2"/>
        <itemref idref="ghost"/>
        <itemref idref="chapter3"/>
        <itemref idref="chapter4" linear="no"/>
    </spine>
</package>"#;

    const NCX: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1">
    <head><meta name="dtb:uid" content="978-1234567890"/></head>
    <docTitle><text>测试书籍</text></docTitle>
    <navMap>
        <navPoint id="n1" playOrder="1">
            <navLabel><text>第一章</text></navLabel><content src="Text/chapter1.xhtml"/>
            <navPoint id="n1-1" playOrder="2">
                <navLabel><text>第一节</text></navLabel><content src="Text/chapter1.xhtml#s1"/>
            </navPoint>
        </navPoint>
        <navPoint id="n2" playOrder="3">
            <navLabel><text>第二章</text></navLabel><content src="Text/chapter2.xhtml"/>
            <navPoint id="n2-1" playOrder="4">
                <navLabel><text>第二节</text></navLabel><content src="Text/chapter3.xhtml"/>
            </navPoint>
        </navPoint>
        <navPoint id="n3" playOrder="5">
            <navLabel><text>附录</text></navLabel><content src="Text/chapter4.xhtml"/>
        </navPoint>
    </navMap>
</ncx>"#;

    const CSS: &str = ".title { font-size: 1.5em; text-align: center; }\n.note { font-size: 12px }";

    const CHAPTER1: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head><title>第一章</title></head>
<body><h1 class="title">第一章</h1><p class="note">这是第一章的内容。</p></body>
</html>"#;

    const CHAPTER2_BROKEN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<body><p>没有闭合的段落</body>
</html>"#;

    const CHAPTER3: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml">
<body><h2>第三章</h2><p>见<a href="chapter1.xhtml#s1">第一节</a></p></body>
</html>"#;

    fn write_epub(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);

        zip.start_file("mimetype", FileOptions::<()>::default()).unwrap();
        zip.write_all(b"application/epub+zip").unwrap();
        zip.start_file("META-INF/container.xml", FileOptions::<()>::default()).unwrap();
        zip.write_all(CONTAINER_XML.as_bytes()).unwrap();

        for (name, content) in entries {
            zip.start_file(format!("OEBPS/{}", name), FileOptions::<()>::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    /// 创建EPUB2测试书籍，返回 (临时目录, epub路径, 解压目录)
    fn epub2_fixture() -> (TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let epub_path = dir.path().join("sample.epub");
        write_epub(
            &epub_path,
            &[
                ("content.opf", EPUB2_OPF),
                ("toc.ncx", NCX),
                ("Styles/style.css", CSS),
                ("Text/chapter1.xhtml", CHAPTER1),
                ("Text/chapter2.xhtml", CHAPTER2_BROKEN),
                ("Text/chapter3.xhtml", CHAPTER3),
                ("Text/chapter4.xhtml", "<html><body><p>附录</p></body></html>"),
            ],
        );
        let extract_dir = dir.path().join("extracted");
        (dir, epub_path, extract_dir)
    }

    #[test]
    fn test_read_epub2_book() {
        let (_dir, epub_path, extract_dir) = epub2_fixture();
        let book = EpubReader::new().read_epub_into(&epub_path, &extract_dir).unwrap();

        assert_eq!(book.name, "sample");
        assert_eq!(book.version, 2.0);
        assert_eq!(book.manifest.len(), 6);
        assert_eq!(book.title(), "测试书籍");
        assert_eq!(book.opf_resource.full_href, extract_dir.join("OEBPS").join("content.opf"));
        assert_eq!(book.resource_base, extract_dir.join("OEBPS"));
        assert_eq!(book.css_string, CSS);

        let spine = book.spine.as_ref().unwrap();
        assert_eq!(spine.len(), 4);
        assert!(spine.iter().all(|r| book.manifest.find_by_id(&r.resource.id).is_some()));
        assert!(!spine.spine_references[3].linear);
        assert!(book.warnings.contains(&ParseWarning::UnresolvedSpineItem {
            idref: "ghost".to_string()
        }));

        assert_eq!(book.toc_resource.as_ref().map(|r| r.id.as_str()), Some("ncx"));
        assert_eq!(book.toc_title.as_deref(), Some("测试书籍"));
        let shape: Vec<usize> = book.table_of_contents.iter().map(|r| r.children.len()).collect();
        assert_eq!(shape, vec![1, 1, 0]);

        assert!(book.cover_image.is_none());
        assert!(book.warnings.contains(&ParseWarning::CoverNotFound));
    }

    #[test]
    fn test_read_epub_is_idempotent() {
        let (_dir, epub_path, extract_dir) = epub2_fixture();
        let reader = EpubReader::new();

        let first = reader.read_epub_into(&epub_path, &extract_dir).unwrap();
        let second = reader.read_epub_into(&epub_path, &extract_dir).unwrap();
        assert_eq!(first.manifest, second.manifest);
        assert_eq!(first.table_of_contents, second.table_of_contents);
    }

    #[test]
    fn test_read_epub_uses_extraction_root() {
        let (dir, epub_path, _) = epub2_fixture();
        let mut config = EpubConfig::default();
        config.archive.extraction_root = dir.path().join("library");

        let book = EpubReader::with_config(config).read_epub(&epub_path).unwrap();
        let expected_dir = archive::extraction_dir_for(&dir.path().join("library"), &epub_path);
        assert!(expected_dir.starts_with(dir.path().join("library")));
        assert_eq!(book.resource_base, expected_dir.join("OEBPS"));
    }

    #[test]
    fn test_manifest_cannot_read_outside_extraction() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("secret.txt"), "host file").unwrap();
        let epub_path = dir.path().join("escape.epub");
        let opf = r#"<package version="3.0" xmlns="http://www.idpf.org/2007/opf">
    <manifest>
        <item id="style" href="../../../../secret.txt" media-type="text/css"/>
        <item id="c1" href="../../../../secret.txt" media-type="text/html"/>
    </manifest>
    <spine><itemref idref="c1"/></spine>
</package>"#;
        write_epub(&epub_path, &[("content.opf", opf)]);

        let extract_dir = dir.path().join("a").join("b").join("c");
        let reader = EpubReader::new();
        let book = reader.read_epub_into(&epub_path, &extract_dir).unwrap();

        let style = book.resource("style").unwrap();
        assert!(style.full_href.starts_with(&extract_dir), "{}", style.full_href.display());
        assert_eq!(book.css_string, "");
        assert!(
            book.warnings
                .iter()
                .any(|w| matches!(w, ParseWarning::StylesheetUnavailable { .. }))
        );

        let chapter = book.resource("c1").unwrap();
        assert!(reader.parse_chapter(&book, chapter).is_empty());
    }

    #[test]
    fn test_same_file_name_in_different_directories() {
        let dir = tempfile::tempdir().unwrap();
        let opf = |title: &str| {
            format!(
                r#"<package version="3.0" xmlns="http://www.idpf.org/2007/opf">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>{}</dc:title></metadata>
    <manifest><item id="c1" href="c1.xhtml" media-type="application/xhtml+xml"/></manifest>
    <spine><itemref idref="c1"/></spine>
</package>"#,
                title
            )
        };

        let mut paths = Vec::new();
        for (folder, title) in [("a", "First Book"), ("b", "Second Book")] {
            fs::create_dir_all(dir.path().join(folder)).unwrap();
            let path = dir.path().join(folder).join("book.epub");
            write_epub(
                &path,
                &[
                    ("content.opf", opf(title).as_str()),
                    ("c1.xhtml", "<html><body><p>x</p></body></html>"),
                ],
            );
            paths.push(path);
        }

        let mut config = EpubConfig::default();
        config.archive.extraction_root = dir.path().join("library");
        let reader = EpubReader::with_config(config);

        let first = reader.read_epub(&paths[0]).unwrap();
        let second = reader.read_epub(&paths[1]).unwrap();
        assert_eq!(first.title(), "First Book");
        assert_eq!(second.title(), "Second Book");
        assert_eq!(first.name, second.name);
        assert_ne!(first.resource_base, second.resource_base);
    }

    #[test]
    fn test_invalid_paths() {
        let dir = tempfile::tempdir().unwrap();
        let reader = EpubReader::new();

        let missing = reader.read_epub(dir.path().join("missing.epub"));
        assert!(matches!(missing, Err(EpubError::InvalidPath(_))));

        let not_zip = dir.path().join("broken.epub");
        fs::write(&not_zip, "not a zip archive").unwrap();
        let broken = reader.read_epub_into(&not_zip, dir.path().join("out"));
        assert!(matches!(broken, Err(EpubError::BookNotAvailable(_))));

        let not_extracted = reader.read_extracted(dir.path().join("nothing"), "nothing");
        assert!(matches!(not_extracted, Err(EpubError::InvalidPath(_))));
    }

    #[test]
    fn test_chapter_styles_applied() {
        let (_dir, epub_path, extract_dir) = epub2_fixture();
        let reader = EpubReader::new();
        let book = reader.read_epub_into(&epub_path, &extract_dir).unwrap();
        let chapter1 = book.resource("chapter1").unwrap();

        let chapter = reader.try_parse_chapter(&book, chapter1).unwrap();
        assert_eq!(chapter.title.as_deref(), Some("第一章"));
        assert_eq!(chapter.nodes.len(), 2);

        let ContentNode::Heading { level, style, .. } = &chapter.nodes[0] else {
            panic!("不是标题: {:?}", chapter.nodes[0]);
        };
        assert_eq!(*level, HeadingLevel::H1);
        assert_eq!(style.font_size, 24.0);
        assert_eq!(style.align, Align::Center);
        assert_eq!(chapter.nodes[1].style().map(|s| s.font_size), Some(12.0));
        assert_eq!(chapter.plain_text(), "第一章\n这是第一章的内容。");
    }

    #[test]
    fn test_malformed_chapter_is_isolated() {
        let (_dir, epub_path, extract_dir) = epub2_fixture();
        let reader = EpubReader::new();
        let book = reader.read_epub_into(&epub_path, &extract_dir).unwrap();

        let broken = book.resource("chapter2").unwrap();
        assert!(reader.parse_chapter(&book, broken).is_empty());
        assert!(matches!(
            reader.try_parse_chapter(&book, broken),
            Err(EpubError::ChapterParseError(_))
        ));

        let next = book.resource("chapter3").unwrap();
        let nodes = reader.parse_chapter(&book, next);
        assert_eq!(nodes.len(), 2);
        let ContentNode::Paragraph { children, .. } = &nodes[1] else {
            panic!("不是段落: {:?}", nodes[1]);
        };
        assert!(matches!(
            &children[1],
            ContentNode::Link { target: Some(target), .. }
                if target.resource_id == "chapter1" && target.fragment.as_deref() == Some("s1")
        ));

        let results = reader.parse_spine(&book);
        let outcomes: Vec<bool> = results.iter().map(Result::is_ok).collect();
        assert_eq!(outcomes, vec![true, false, true, true]);
    }

    #[test]
    fn test_read_epub3_with_nav_and_cover() {
        let dir = tempfile::tempdir().unwrap();
        let epub_path = dir.path().join("modern.epub");
        let opf = r#"<?xml version="1.0" encoding="UTF-8"?>
<package version="3.0" xmlns="http://www.idpf.org/2007/opf" unique-identifier="uid">
    <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
        <dc:identifier id="uid">urn:uuid:1</dc:identifier>
        <dc:title>Modern</dc:title>
        <meta name="cover" content="cover-img"/>
    </metadata>
    <manifest>
        <item id="nav" href="nav.xhtml" media-type="application/xhtml+xml" properties="nav"/>
        <item id="cover-img" href="Images/cover.jpg" media-type="image/jpeg"/>
        <item id="c1" href="Text/c1.xhtml" media-type="application/xhtml+xml"/>
        <item id="c2" href="Text/c2.xhtml" media-type="application/xhtml+xml"/>
    </manifest>
    <spine><itemref idref="c1"/><itemref idref="c2"/></spine>
</package>"#;
        let nav = r#"<?xml version="1.0" encoding="UTF-8"?>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops">
<body><nav epub:type="toc"><ol>
    <li><a href="Text/c1.xhtml">One</a><ol><li><a href="Text/c2.xhtml#part">Two</a></li></ol></li>
</ol></nav></body></html>"#;

        write_epub(
            &epub_path,
            &[
                ("content.opf", opf),
                ("nav.xhtml", nav),
                ("Images/cover.jpg", "jpeg"),
                ("Text/c1.xhtml", "<html><body><p>One</p></body></html>"),
                ("Text/c2.xhtml", "<html><body><p>Two</p></body></html>"),
            ],
        );

        let book = EpubReader::new()
            .read_epub_into(&epub_path, dir.path().join("out"))
            .unwrap();

        assert_eq!(book.version, 3.0);
        assert_eq!(book.cover_image.as_ref().map(|r| r.id.as_str()), Some("cover-img"));
        assert_eq!(book.toc_resource.as_ref().map(|r| r.id.as_str()), Some("nav"));
        assert_eq!(book.table_of_contents.len(), 1);
        assert_eq!(book.table_of_contents[0].children[0].fragment_id.as_deref(), Some("part"));
        assert_eq!(book.css_string, "");
        assert!(book.warnings.is_empty(), "{:?}", book.warnings);
    }

    #[test]
    fn test_chapters_parse_in_parallel() {
        let (_dir, epub_path, extract_dir) = epub2_fixture();
        let reader = EpubReader::new();
        let book = reader.read_epub_into(&epub_path, &extract_dir).unwrap();

        let counts: Vec<usize> = std::thread::scope(|scope| {
            let handles: Vec<_> = book
                .chapters()
                .into_iter()
                .map(|resource| {
                    let (reader, book) = (&reader, &book);
                    scope.spawn(move || reader.parse_chapter(book, resource).len())
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(counts, vec![2, 0, 2, 1]);
    }
}
