//! 目录树（Table of Contents Tree）模块
//!
//! 提供目录条目的树形表示、清单引用解析和显示功能。

use crate::epub::opf::Manifest;
use crate::epub::resource::{EpubResource, split_fragment};
use crate::epub::toc::nav_doc::NavItem;
use crate::epub::toc::navigation::NavPoint;
use serde::Serialize;
use std::fmt::{Display, Formatter, Result as FmtResult};

/// 目录条目
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocReference {
    /// 标题
    pub title: String,
    /// 指向的清单资源，链接无法解析时为None
    pub resource: Option<EpubResource>,
    /// 文档内的片段标识
    pub fragment_id: Option<String>,
    /// 子条目
    pub children: Vec<TocReference>,
}

impl TocReference {
    /// 是否为叶子节点
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// 以此节点为根的子树深度
    pub fn depth(&self) -> u32 {
        1 + self
            .children
            .iter()
            .map(TocReference::depth)
            .max()
            .unwrap_or(0)
    }

    /// 以此节点为根的子树节点数
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TocReference::count).sum::<usize>()
    }

    fn leaf_count(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            self.children.iter().map(TocReference::leaf_count).sum()
        }
    }

    /// 链接显示形式：`href#fragment`
    pub fn target(&self) -> Option<String> {
        let resource = self.resource.as_ref()?;
        Some(match &self.fragment_id {
            Some(fragment) => format!("{}#{}", resource.href, fragment),
            None => resource.href.clone(),
        })
    }
}

/// 把目录文档中的链接解析到清单资源上
pub struct TocBuilder<'a> {
    manifest: &'a Manifest,
    /// 目录文档自身的href（相对OPF），链接相对于它解析
    document_href: &'a str,
}

impl<'a> TocBuilder<'a> {
    pub fn new(manifest: &'a Manifest, document_href: &'a str) -> Self {
        Self {
            manifest,
            document_href,
        }
    }

    /// 创建一个条目，解析不了的链接保留为 `resource = None`
    pub fn reference(
        &self,
        title: String,
        href: Option<&str>,
        children: Vec<TocReference>,
    ) -> TocReference {
        let (resource, fragment_id) = match href.filter(|h| !h.trim().is_empty()) {
            Some(href) => {
                let (path, fragment) = split_fragment(href);
                let resource = if path.is_empty() {
                    self.manifest.find_by_href(self.document_href)
                } else {
                    self.manifest.resolve_relative(self.document_href, href)
                };
                if resource.is_none() {
                    tracing::debug!("目录链接无法解析: {}", href);
                }
                (resource.cloned(), fragment)
            }
            None => (None, None),
        };

        TocReference {
            title,
            resource,
            fragment_id,
            children,
        }
    }

    /// 递归转换NCX导航点
    pub fn from_nav_point(&self, nav_point: &NavPoint) -> TocReference {
        let children = nav_point
            .children
            .iter()
            .map(|child| self.from_nav_point(child))
            .collect();
        self.reference(
            nav_point.nav_label.text.clone(),
            Some(nav_point.content.src.as_str()),
            children,
        )
    }

    /// 递归转换导航文档条目
    pub fn from_nav_item(&self, item: &NavItem) -> TocReference {
        let children = item
            .children
            .iter()
            .map(|child| self.from_nav_item(child))
            .collect();
        self.reference(item.label.clone(), item.href.as_deref(), children)
    }
}

/// 目录树统计信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TocStatistics {
    /// 总节点数
    pub total_nodes: usize,
    /// 最大深度
    pub max_depth: u32,
    /// 叶子节点数
    pub leaf_count: usize,
    /// 根节点数
    pub root_count: usize,
}

impl TocStatistics {
    /// 统计目录森林
    pub fn collect(roots: &[TocReference]) -> Self {
        Self {
            total_nodes: roots.iter().map(TocReference::count).sum(),
            max_depth: roots.iter().map(TocReference::depth).max().unwrap_or(0),
            leaf_count: roots.iter().map(TocReference::leaf_count).sum(),
            root_count: roots.len(),
        }
    }
}

impl Display for TocStatistics {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "目录统计: {} 个章节, {} 个根节点, {} 个叶子节点, 最大深度: {}",
            self.total_nodes, self.root_count, self.leaf_count, self.max_depth
        )
    }
}

/// 目录树显示样式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TocTreeStyle {
    /// 使用树状符号（├── └──）
    TreeSymbols,
    /// 使用缩进和符号（• ）
    Indented,
}

/// 目录森林的文本渲染
pub struct TocTree<'a> {
    /// 文档标题
    pub title: Option<&'a str>,
    /// 根节点列表
    pub roots: &'a [TocReference],
    /// 显示样式
    pub style: TocTreeStyle,
    /// 是否显示文件路径
    pub show_paths: bool,
    /// 最大显示深度（None表示显示所有）
    pub max_depth: Option<u32>,
}

impl<'a> TocTree<'a> {
    /// 创建新的目录树
    ///
    /// ```rust
    /// use epubforge::epub::toc::{TocTree, TocTreeStyle};
    ///
    /// let tree = TocTree::new(&[]).with_style(TocTreeStyle::Indented);
    /// assert_eq!(tree.to_string(), "");
    /// ```
    pub fn new(roots: &'a [TocReference]) -> Self {
        Self {
            title: None,
            roots,
            style: TocTreeStyle::TreeSymbols,
            show_paths: true,
            max_depth: None,
        }
    }

    /// 设置文档标题
    pub fn with_title(mut self, title: Option<&'a str>) -> Self {
        self.title = title;
        self
    }

    /// 设置显示样式
    pub fn with_style(mut self, style: TocTreeStyle) -> Self {
        self.style = style;
        self
    }

    /// 设置是否显示文件路径
    pub fn with_show_paths(mut self, show_paths: bool) -> Self {
        self.show_paths = show_paths;
        self
    }

    /// 设置最大显示深度
    pub fn with_max_depth(mut self, max_depth: Option<u32>) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn label(&self, node: &TocReference) -> String {
        if !self.show_paths {
            return node.title.clone();
        }
        match node.target() {
            Some(target) => format!("{} → {}", node.title, target),
            None => format!("{} → (未解析)", node.title),
        }
    }

    fn reached_max_depth(&self, current_depth: u32) -> bool {
        self.max_depth
            .map(|max_depth| current_depth + 1 >= max_depth)
            .unwrap_or(false)
    }

    /// 渲染树状符号风格
    fn render_tree_style(
        &self,
        node: &TocReference,
        current_depth: u32,
        is_last: bool,
        prefix: &str,
        result: &mut String,
    ) {
        let current_prefix = if is_last { "└── " } else { "├── " };
        result.push_str(&format!("{}{}{}\n", prefix, current_prefix, self.label(node)));

        if self.reached_max_depth(current_depth) {
            return;
        }

        let child_prefix = format!("{}{}", prefix, if is_last { "    " } else { "│   " });
        for (index, child) in node.children.iter().enumerate() {
            let is_child_last = index == node.children.len() - 1;
            self.render_tree_style(child, current_depth + 1, is_child_last, &child_prefix, result);
        }
    }

    /// 渲染缩进风格
    fn render_indent_style(&self, node: &TocReference, current_depth: u32, result: &mut String) {
        let indent = "  ".repeat(current_depth as usize);
        result.push_str(&format!("{}• {}\n", indent, self.label(node)));

        if self.reached_max_depth(current_depth) {
            return;
        }

        for child in &node.children {
            self.render_indent_style(child, current_depth + 1, result);
        }
    }
}

impl Display for TocTree<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let mut result = String::new();

        if let Some(title) = self.title {
            result.push_str(&format!("📖 {}\n", title));
            result.push_str("═══════════════════════════════════════\n\n");
        }

        for (index, root) in self.roots.iter().enumerate() {
            match self.style {
                TocTreeStyle::TreeSymbols => {
                    let is_last = index == self.roots.len() - 1;
                    self.render_tree_style(root, 0, is_last, "", &mut result);
                }
                TocTreeStyle::Indented => self.render_indent_style(root, 0, &mut result),
            }
        }

        write!(f, "{}", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::Path;

    fn manifest() -> Manifest {
        let mut manifest = Manifest::new();
        for (id, href) in [("nav", "Text/nav.xhtml"), ("ch1", "Text/ch1.xhtml"), ("ch2", "Text/ch2.xhtml")] {
            manifest.push(EpubResource::new(
                id.to_string(),
                href.to_string(),
                "application/xhtml+xml",
                None,
                Path::new("/b"),
            ));
        }
        manifest
    }

    fn forest(builder: &TocBuilder<'_>) -> Vec<TocReference> {
        vec![
            builder.reference(
                "One".to_string(),
                Some("ch1.xhtml"),
                vec![builder.reference("One.1".to_string(), Some("ch1.xhtml#s1"), vec![])],
            ),
            builder.reference("Two".to_string(), Some("../Text/ch2.xhtml"), vec![]),
            builder.reference("Lost".to_string(), Some("missing.xhtml"), vec![]),
        ]
    }

    #[test]
    fn test_builder_resolves_relative_to_toc_document() {
        let manifest = manifest();
        let builder = TocBuilder::new(&manifest, "Text/nav.xhtml");
        let roots = forest(&builder);

        assert_eq!(roots[0].resource.as_ref().map(|r| r.id.as_str()), Some("ch1"));
        assert_eq!(roots[0].children[0].fragment_id.as_deref(), Some("s1"));
        assert_eq!(roots[1].resource.as_ref().map(|r| r.id.as_str()), Some("ch2"));
        assert!(roots[2].resource.is_none());
        assert_eq!(roots[2].title, "Lost");

        let self_link = builder.reference("Top".to_string(), Some("#top"), vec![]);
        assert_eq!(self_link.resource.as_ref().map(|r| r.id.as_str()), Some("nav"));
        assert_eq!(self_link.fragment_id.as_deref(), Some("top"));
    }

    #[test]
    fn test_statistics() {
        let manifest = manifest();
        let builder = TocBuilder::new(&manifest, "Text/nav.xhtml");
        let roots = forest(&builder);

        let stats = TocStatistics::collect(&roots);
        assert_eq!(
            stats,
            TocStatistics {
                total_nodes: 4,
                max_depth: 2,
                leaf_count: 3,
                root_count: 3,
            }
        );
    }

    #[test]
    fn test_tree_rendering() {
        let manifest = manifest();
        let builder = TocBuilder::new(&manifest, "Text/nav.xhtml");
        let roots = forest(&builder);

        let rendered = TocTree::new(&roots).with_show_paths(false).to_string();
        assert_eq!(rendered, "├── One\n│   └── One.1\n├── Two\n└── Lost\n");

        let indented = TocTree::new(&roots)
            .with_style(TocTreeStyle::Indented)
            .with_max_depth(Some(1))
            .to_string();
        assert_eq!(
            indented,
            "• One → Text/ch1.xhtml\n• Two → Text/ch2.xhtml\n• Lost → (未解析)\n"
        );
    }
}
