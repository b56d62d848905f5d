//! EPUB压缩包访问模块
//!
//! 负责把 `.epub` 文件解压到磁盘目录，后续所有解析都基于解压后的目录进行。
//! 解压是幂等的：目标目录中的来源记录与epub文件一致时直接跳过。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use zip::ZipArchive;

use crate::epub::error::{EpubError, Result};

/// EPUB的标准mimetype
pub const EPUB_MIMETYPE: &str = "application/epub+zip";

/// 解压目录中记录来源文件的文件名
pub const SOURCE_MARKER: &str = ".epubforge-source.yaml";

/// 解压结果对应的epub文件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMarker {
    /// epub文件的规范化绝对路径
    pub source: PathBuf,
    pub size: u64,
    /// 修改时间（UNIX纪元以来的秒与纳秒）
    pub modified_secs: u64,
    pub modified_nanos: u32,
}

impl ExtractionMarker {
    /// 读取epub文件当前的路径、大小和修改时间
    pub fn for_archive(archive_path: &Path) -> Result<Self> {
        let source = fs::canonicalize(archive_path)?;
        let metadata = fs::metadata(&source)?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();
        Ok(Self {
            source,
            size: metadata.len(),
            modified_secs: modified.as_secs(),
            modified_nanos: modified.subsec_nanos(),
        })
    }

    /// 读取解压目录中的来源记录，不存在或无法解析时为None
    pub fn read(dest_dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(dest_dir.join(SOURCE_MARKER)).ok()?;
        serde_yml::from_str(&content).ok()
    }

    fn write(&self, dest_dir: &Path) -> Result<()> {
        let content = serde_yml::to_string(self)
            .map_err(|e| EpubError::BookNotAvailable(format!("无法写入来源记录: {}", e)))?;
        fs::write(dest_dir.join(SOURCE_MARKER), content)?;
        Ok(())
    }
}

/// 判断目录是否已经包含解压好的EPUB
pub fn is_extracted(dest_dir: &Path) -> bool {
    dest_dir.join("META-INF").join("container.xml").is_file()
}

/// 计算某个EPUB文件在解压根目录下对应的目录
///
/// 目录名由文件名和规范化路径的SHA-256前缀组成，不同位置的同名文件不会共用目录。
///
/// # 参数
/// * `root` - 解压根目录
/// * `archive_path` - epub文件路径
pub fn extraction_dir_for(root: &Path, archive_path: &Path) -> PathBuf {
    let stem = archive_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "book".to_string());

    let source = fs::canonicalize(archive_path).unwrap_or_else(|_| archive_path.to_path_buf());
    let mut hasher = Sha256::new();
    hasher.update(source.to_string_lossy().as_bytes());
    let digest = hasher.finalize();
    let key: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();

    root.join(format!("{}-{}", stem, key))
}

/// 检查输入路径是否指向一个存在的 `.epub` 文件
pub fn validate_archive_path(archive_path: &Path) -> Result<()> {
    if !archive_path.is_file() {
        return Err(EpubError::InvalidPath(format!(
            "文件不存在: {}",
            archive_path.display()
        )));
    }

    let is_epub = archive_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("epub"))
        .unwrap_or(false);

    if !is_epub {
        return Err(EpubError::InvalidPath(format!(
            "不是.epub文件: {}",
            archive_path.display()
        )));
    }

    Ok(())
}

/// 解压EPUB文件到指定目录
///
/// 目录中的来源记录与epub文件的路径、大小、修改时间都一致时跳过解压。
/// 记录不一致时删除旧的解压结果后重新解压。
///
/// # 参数
/// * `archive_path` - epub文件路径
/// * `dest_dir` - 解压目标目录
///
/// # 返回值
/// * `Result<PathBuf>` - 解压后的目录
pub fn extract<P: AsRef<Path>, Q: AsRef<Path>>(archive_path: P, dest_dir: Q) -> Result<PathBuf> {
    let archive_path = archive_path.as_ref();
    let dest_dir = dest_dir.as_ref();

    validate_archive_path(archive_path)?;
    let marker = ExtractionMarker::for_archive(archive_path)?;

    match ExtractionMarker::read(dest_dir) {
        Some(existing) if existing == marker && is_extracted(dest_dir) => {
            tracing::debug!("已解压，跳过: {}", dest_dir.display());
            return Ok(dest_dir.to_path_buf());
        }
        Some(existing) => {
            tracing::info!(
                "解压目录来源已变化 ({} → {})，重新解压",
                existing.source.display(),
                marker.source.display()
            );
            fs::remove_dir_all(dest_dir)?;
        }
        None => {}
    }

    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file).map_err(|e| {
        EpubError::BookNotAvailable(format!("{}: {}", archive_path.display(), e))
    })?;

    check_mimetype(&mut archive);

    fs::create_dir_all(dest_dir)?;
    archive.extract(dest_dir)?;
    marker.write(dest_dir)?;

    tracing::info!(
        "已解压 {} 个条目到 {}",
        archive.len(),
        dest_dir.display()
    );

    Ok(dest_dir.to_path_buf())
}

/// 检查mimetype条目
///
/// 很多现实中的EPUB缺少或写错mimetype，这里只记录警告。
fn check_mimetype(archive: &mut ZipArchive<File>) {
    match archive.by_name("mimetype") {
        Ok(mut file) => {
            let mut content = String::new();
            if file.read_to_string(&mut content).is_ok() && content.trim() != EPUB_MIMETYPE {
                tracing::warn!(
                    "mimetype不匹配: 期望 {}, 找到 {}",
                    EPUB_MIMETYPE,
                    content.trim()
                );
            }
        }
        Err(_) => tracing::warn!("缺少mimetype文件"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn write_archive(path: &Path) {
        write_archive_with(path, "<container/>");
    }

    fn write_archive_with(path: &Path, container: &str) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.start_file("mimetype", FileOptions::<()>::default()).unwrap();
        zip.write_all(EPUB_MIMETYPE.as_bytes()).unwrap();
        zip.start_file("META-INF/container.xml", FileOptions::<()>::default()).unwrap();
        zip.write_all(container.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    fn container_of(dest: &Path) -> String {
        fs::read_to_string(dest.join("META-INF").join("container.xml")).unwrap()
    }

    #[test]
    fn test_extract_and_skip_when_present() {
        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("book.epub");
        write_archive(&epub);

        let dest = extraction_dir_for(&dir.path().join("out"), &epub);
        let dir_name = dest.file_name().unwrap().to_string_lossy().to_string();
        assert!(dir_name.starts_with("book-"), "{}", dir_name);
        assert_eq!(dest, extraction_dir_for(&dir.path().join("out"), &epub));

        let extracted = extract(&epub, &dest).unwrap();
        assert!(is_extracted(&extracted));

        // 再次解压应直接跳过，不会清理目录
        fs::write(dest.join("marker"), b"x").unwrap();
        extract(&epub, &dest).unwrap();
        assert!(dest.join("marker").exists());

        let recorded = ExtractionMarker::read(&dest).unwrap();
        assert_eq!(recorded, ExtractionMarker::for_archive(&epub).unwrap());
    }

    #[test]
    fn test_same_name_in_different_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("a")).unwrap();
        fs::create_dir_all(dir.path().join("b")).unwrap();
        let first = dir.path().join("a").join("book.epub");
        let second = dir.path().join("b").join("book.epub");
        write_archive_with(&first, "<container>first</container>");
        write_archive_with(&second, "<container>second book</container>");

        let root = dir.path().join("out");
        let first_dest = extraction_dir_for(&root, &first);
        let second_dest = extraction_dir_for(&root, &second);
        assert_ne!(first_dest, second_dest);

        extract(&first, &first_dest).unwrap();
        extract(&second, &second_dest).unwrap();
        assert_eq!(container_of(&first_dest), "<container>first</container>");
        assert_eq!(container_of(&second_dest), "<container>second book</container>");
    }

    #[test]
    fn test_changed_archive_is_extracted_again() {
        let dir = tempfile::tempdir().unwrap();
        let epub = dir.path().join("book.epub");
        let dest = dir.path().join("out");

        write_archive_with(&epub, "<container>old</container>");
        extract(&epub, &dest).unwrap();
        fs::write(dest.join("stale"), b"x").unwrap();

        // 原地替换为内容不同的文件
        write_archive_with(&epub, "<container>replaced content</container>");
        extract(&epub, &dest).unwrap();
        assert_eq!(container_of(&dest), "<container>replaced content</container>");
        assert!(!dest.join("stale").exists());

        // 同一目录被另一本书使用时也会重新解压
        let other = dir.path().join("other.epub");
        write_archive_with(&other, "<container>other</container>");
        extract(&other, &dest).unwrap();
        assert_eq!(container_of(&dest), "<container>other</container>");
    }

    #[test]
    fn test_missing_file_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let result = extract(dir.path().join("nope.epub"), dir.path().join("out"));
        assert!(matches!(result, Err(EpubError::InvalidPath(_))));
    }

    #[test]
    fn test_wrong_extension_is_invalid_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.txt");
        fs::write(&path, b"hello").unwrap();
        let result = extract(&path, dir.path().join("out"));
        assert!(matches!(result, Err(EpubError::InvalidPath(_))));
    }

    #[test]
    fn test_not_a_zip_is_book_not_available() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.epub");
        fs::write(&path, b"definitely not a zip").unwrap();
        let result = extract(&path, dir.path().join("out"));
        assert!(matches!(result, Err(EpubError::BookNotAvailable(_))));
    }
}
