use crate::epub::error::{EpubError, Result};
use crate::epub::resource::resolve_href_within;
use crate::epub::xml;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::fs;
use std::path::{Path, PathBuf};

/// OPF包文件的媒体类型
pub const OPF_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Container.xml中的rootfile信息
#[derive(Debug, Clone)]
pub struct RootFile {
    pub full_path: String,
    pub media_type: Option<String>,
}

/// Container.xml的解析结果
#[derive(Debug, Clone)]
pub struct Container {
    pub rootfiles: Vec<RootFile>,
}

/// OPF包文件在解压目录中的位置
#[derive(Debug, Clone, PartialEq)]
pub struct PackageLocation {
    /// OPF文件相对于EPUB根目录的路径（如 `OEBPS/content.opf`）
    pub opf_href: String,
    /// OPF文件的绝对路径
    pub opf_path: PathBuf,
    /// 资源基础路径：OPF所在目录，清单中的相对路径都基于此解析
    pub resource_base: PathBuf,
}

impl RootFile {
    /// 是否声明为OPF包文件
    pub fn is_package(&self) -> bool {
        self.media_type.as_deref() == Some(OPF_MEDIA_TYPE)
    }
}

impl Container {
    /// 解析container.xml内容
    ///
    /// 收集所有带 `full-path` 的 `rootfile` 元素，忽略它们在文档中的嵌套位置。
    ///
    /// # 参数
    /// * `xml_content` - container.xml的文件内容
    ///
    /// # 返回值
    /// * `Result<Container>` - 一个rootfile都没有时返回 `ContainerParseError`
    pub fn parse(xml_content: &str) -> Result<Container> {
        let mut reader = Reader::from_str(xml_content);
        reader.config_mut().trim_text(true);

        let mut rootfiles = Vec::new();
        loop {
            match reader.read_event()? {
                Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"rootfile" => {
                    let mut attrs = xml::attributes(&e)?;
                    match attrs.remove("full-path").filter(|path| !path.trim().is_empty()) {
                        Some(full_path) => rootfiles.push(RootFile {
                            full_path,
                            media_type: attrs.remove("media-type"),
                        }),
                        None => tracing::warn!("跳过缺少full-path的rootfile"),
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if rootfiles.is_empty() {
            return Err(EpubError::ContainerParseError(
                "没有找到任何rootfile条目".to_string()
            ));
        }

        Ok(Container { rootfiles })
    }

    /// 选出OPF包文件对应的rootfile
    ///
    /// 优先取第一个媒体类型为 `application/oebps-package+xml` 的条目，否则取第一个条目。
    pub fn package_rootfile(&self) -> Option<&RootFile> {
        self.rootfiles
            .iter()
            .find(|rootfile| rootfile.is_package())
            .or_else(|| self.rootfiles.first())
    }

    /// 读取解压目录中的 `META-INF/container.xml` 并定位OPF文件
    ///
    /// OPF路径在解压根目录内解析，`../` 不会越过根目录。
    ///
    /// # 参数
    /// * `root_dir` - EPUB解压后的根目录
    ///
    /// # 返回值
    /// * `Result<PackageLocation>` - 目录或文件无法读取时返回 `InvalidPath`
    pub fn locate_package(root_dir: &Path) -> Result<PackageLocation> {
        if !root_dir.is_dir() {
            return Err(EpubError::InvalidPath(format!(
                "目录不存在: {}",
                root_dir.display()
            )));
        }

        let container_path = root_dir.join("META-INF").join("container.xml");
        let content = fs::read_to_string(&container_path).map_err(|e| {
            EpubError::InvalidPath(format!("{}: {}", container_path.display(), e))
        })?;

        let container = Self::parse(&content)?;
        let rootfile = container.package_rootfile().ok_or_else(|| {
            EpubError::ContainerParseError("container.xml中没有找到有效的rootfile".to_string())
        })?;
        if !rootfile.is_package() {
            tracing::warn!("rootfile未声明OPF媒体类型，仍按OPF读取: {}", rootfile.full_path);
        }

        let opf_href = rootfile.full_path.trim().to_string();
        let opf_path = resolve_href_within(root_dir, root_dir, &opf_href);
        let resource_base = opf_path
            .parent()
            .filter(|parent| parent.starts_with(root_dir))
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root_dir.to_path_buf());

        tracing::debug!("OPF路径: {}, 资源基础路径: {}", opf_href, resource_base.display());

        Ok(PackageLocation {
            opf_href,
            opf_path,
            resource_base,
        })
    }
}
