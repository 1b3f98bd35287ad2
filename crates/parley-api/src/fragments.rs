//! HTML fragments carried by stream directives.
//!
//! Every fragment is rendered without a viewer, so the same markup can be
//! broadcast to all subscribers. Tera autoescapes `.html` templates, which
//! covers all user-supplied text.

use anyhow::Result;
use tera::{Context, Tera};
use uuid::Uuid;

use parley_types::models::Comment;

/// Container that top-level comments are appended to.
pub const COMMENTS_CONTAINER: &str = "comments-wrapper";

const TEMPLATES: [(&str, &str); 5] = [
    ("comment_body.html", include_str!("../templates/comment_body.html")),
    ("comment.html", include_str!("../templates/comment.html")),
    ("root_comment.html", include_str!("../templates/root_comment.html")),
    ("reply_form.html", include_str!("../templates/reply_form.html")),
    ("edit_form.html", include_str!("../templates/edit_form.html")),
];

pub fn dom_id(id: Uuid) -> String {
    format!("comment_{}", id)
}

/// Container holding every reply of the thread rooted at `root_id`.
pub fn thread_dom_id(root_id: Uuid) -> String {
    format!("comment_{}_thread", root_id)
}

pub struct Fragments {
    tera: Tera,
}

impl Fragments {
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    /// The whole comment element.
    pub fn comment(&self, comment: &Comment) -> Result<String> {
        self.render("comment.html", comment)
    }

    /// Contents of the comment element, for in-place updates.
    pub fn comment_body(&self, comment: &Comment) -> Result<String> {
        self.render("comment_body.html", comment)
    }

    /// A top-level comment together with its (empty) reply container.
    pub fn root_comment(&self, comment: &Comment) -> Result<String> {
        self.render("root_comment.html", comment)
    }

    pub fn reply_form(&self, comment: &Comment) -> Result<String> {
        self.render("reply_form.html", comment)
    }

    pub fn edit_form(&self, comment: &Comment) -> Result<String> {
        self.render("edit_form.html", comment)
    }

    fn render(&self, template: &str, comment: &Comment) -> Result<String> {
        let mut ctx = Context::new();
        ctx.insert("comment", comment);
        ctx.insert("dom_id", &dom_id(comment.id));
        ctx.insert("thread_dom_id", &thread_dom_id(comment.thread_id()));
        Ok(self.tera.render(template, &ctx)?)
    }
}
