//! 样式解析
//!
//! 顺序：类型默认值 → `class` 中每个类（按出现顺序）→ 元素的 `style` 属性。
//! 父元素的样式不会传给子元素。

use crate::epub::config::StyleConfig;
use crate::epub::content::node::{Edges, HeadingLevel, Style};
use crate::epub::css::{self, Declarations, Stylesheet};
use scraper::node::Element;

/// 结合样式表和默认值计算元素样式
pub struct StyleResolver<'a> {
    stylesheet: &'a Stylesheet,
    config: &'a StyleConfig,
}

impl<'a> StyleResolver<'a> {
    pub fn new(stylesheet: &'a Stylesheet, config: &'a StyleConfig) -> Self {
        Self { stylesheet, config }
    }

    /// 根样式（body）
    pub fn root(&self) -> Style {
        Style::with_font_size(self.config.body_font_size)
    }

    /// 标题样式：从标题级别的默认字号开始，左对齐，不读取父元素
    pub fn heading(&self, element: &Element, level: HeadingLevel) -> Style {
        self.resolve(element, Style::with_font_size(self.config.heading_font_size(level.level())))
    }

    /// 段落、span、div等：从正文默认字号开始，不读取父元素
    pub fn block(&self, element: &Element) -> Style {
        self.resolve(element, self.root())
    }

    /// 在基础样式上依次叠加类选择器和行内样式
    pub fn resolve(&self, element: &Element, base: Style) -> Style {
        let mut style = base;
        for declarations in self.declarations(element) {
            self.apply(&mut style, &declarations);
        }
        style
    }

    /// 内边距，没有任何padding声明时为None
    pub fn padding(&self, element: &Element) -> Option<Edges> {
        let mut padding = Edges::default();
        let mut found = false;
        for declarations in self.declarations(element) {
            found |= css::apply_edges(&declarations, "padding", &mut padding, self.config.root_em_px);
        }
        found.then_some(padding)
    }

    fn declarations(&self, element: &Element) -> Vec<Declarations> {
        let mut layers = Vec::new();

        if !self.stylesheet.is_empty() {
            if let Some(classes) = element.attr("class") {
                layers.extend(
                    classes
                        .split_whitespace()
                        .filter_map(|class| self.stylesheet.class(class))
                        .cloned(),
                );
            }
        }

        if let Some(inline) = element.attr("style") {
            let declarations = css::parse_declarations(inline);
            if !declarations.is_empty() {
                layers.push(declarations);
            }
        }

        layers
    }

    fn apply(&self, style: &mut Style, declarations: &Declarations) {
        let root_em_px = self.config.root_em_px;

        if let Some(size) = declarations
            .get("font-size")
            .and_then(|v| css::css_length(v, root_em_px))
        {
            style.font_size = size;
        }
        if let Some(align) = declarations.get("text-align").and_then(|v| css::text_align(v)) {
            style.align = align;
        }
        css::apply_edges(declarations, "margin", &mut style.margin, root_em_px);
    }
}
