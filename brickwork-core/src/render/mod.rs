use anyhow::Context;

use crate::{
    classify::document::{ClassifiedDocument, ClassifiedPage},
    elements::Element,
};

pub mod markdown;

pub trait Render {
    type Output;
    fn render<R: Renderer>(&self, renderer: &mut R) -> anyhow::Result<Self::Output>;
}

pub trait Renderer {
    type Ok;

    fn render_page(&mut self, page: &ClassifiedPage) -> anyhow::Result<Self::Ok>;

    fn render_element(&mut self, element: &Element, depth: usize) -> anyhow::Result<Self::Ok>;
}

impl Render for &ClassifiedDocument {
    type Output = ();

    fn render<R: Renderer>(&self, renderer: &mut R) -> anyhow::Result<()> {
        for page in &self.pages {
            renderer
                .render_page(page)
                .with_context(|| format!("can't render page {}", page.page_index))?;
            if let Some(root) = &page.page {
                let mut res = Ok(());
                // the page element itself is covered by render_page
                for child in root.children() {
                    child.walk(&mut |element, depth| {
                        if res.is_ok() {
                            res = renderer.render_element(element, depth).map(|_| ());
                        }
                    });
                }
                res.context("can't render element")?;
            }
        }
        Ok(())
    }
}
