//! List site content

use anyhow::Result;

use crate::content::ContentLoader;
use crate::helpers::format_publication_date;
use crate::Blog;

/// List site content by type
pub async fn run(blog: &Blog, content_type: &str) -> Result<()> {
    let loader = ContentLoader::new(blog)?;

    match content_type {
        "post" | "posts" => {
            let pages = loader.load_all_pages().await?;
            let posts = pages.last().map(|p| p.results.as_slice()).unwrap_or(&[]);
            println!("Posts ({}):", posts.len());
            for post in posts {
                let date = format_publication_date(
                    post.first_publication_date.as_deref(),
                    &blog.config.language,
                    &blog.config.tz(),
                );
                println!("  {} - {} [{}]", date, post.title, post.uid);
            }
        }
        "ref" | "refs" => {
            let info = loader.client().api_info().await?;
            println!("Refs ({}):", info.refs.len());
            for api_ref in &info.refs {
                let marker = if api_ref.is_master_ref { " (master)" } else { "" };
                println!("  {} - {}{}", api_ref.label, api_ref.reference, marker);
            }
        }
        _ => {
            anyhow::bail!("Unknown type: {}. Available: post, ref", content_type);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{post_doc, MockPrismic};

    #[tokio::test]
    async fn test_list_types() {
        let mock =
            MockPrismic::spawn(vec![post_doc("only", "Only", "2021-03-19T10:00:00+0000")]).await;
        let mut blog = Blog::new(std::env::temp_dir()).unwrap();
        blog.config.prismic.endpoint = mock.endpoint.clone();
        blog.config.prismic.access_token = None;

        run(&blog, "post").await.unwrap();
        run(&blog, "ref").await.unwrap();
        assert!(run(&blog, "tag").await.is_err());
    }
}
