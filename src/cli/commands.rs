use std::sync::Arc;

use crate::app::{AppContext, Result};
use crate::domain::{Article, ArticlePage, CATEGORIES};

pub async fn latest(ctx: &AppContext, page: u32) {
    let result = ctx.service.latest_news(page).await;
    print_page(&result, page);
}

pub async fn featured(ctx: &AppContext) {
    let articles = ctx.service.featured_news().await;
    if articles.is_empty() {
        println!("No featured stories");
        return;
    }
    for article in &articles {
        print_article(article);
    }
}

pub async fn category(ctx: &AppContext, id: u64, page: u32) {
    let result = ctx.service.posts_by_category(id, page).await;
    print_page(&result, page);
}

pub async fn search(ctx: &AppContext, query: &str, page: u32) {
    let result = ctx.service.search_posts(query, page).await;
    if result.posts.is_empty() {
        println!("No results for \"{query}\"");
        return;
    }
    print_page(&result, page);
}

pub fn categories() {
    for category in CATEGORIES {
        println!("{:>3}  {} ({})", category.id, category.title, category.slug);
    }
}

pub async fn daemon(ctx: Arc<AppContext>) -> Result<()> {
    let mut scheduler = ctx.start_prefetch();
    println!("Prefetcher running; Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    scheduler.shutdown();
    println!("Stopped");
    Ok(())
}

pub fn print_stats(ctx: &AppContext) {
    let snapshot = ctx.service.metrics_snapshot();
    println!();
    println!("requests:        {}", snapshot.requests);
    println!("cache hits:      {}", snapshot.cache_hits);
    println!("timeouts:        {}", snapshot.timeouts);
    println!("retries:         {}", snapshot.retries);
    println!("avg response:    {:.0} ms", snapshot.avg_response_time_ms);
    println!("cache hit rate:  {:.1}%", snapshot.cache_hit_rate_percent);
    println!("connection:      {}", snapshot.connection_quality);
    println!("cached entries:  {}", snapshot.cache_size);
}

fn print_page(result: &ArticlePage, page: u32) {
    if result.posts.is_empty() {
        println!("No posts");
        return;
    }

    for article in &result.posts {
        print_article(article);
    }

    let tail = if result.has_more {
        "more available"
    } else {
        "end of results"
    };
    println!("\nPage {page} of {} ({tail})", result.total_pages);
}

fn print_article(article: &Article) {
    let date = article
        .published_at
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "          ".to_string());

    println!(
        "{} [{}] {} ({} min)",
        date,
        article.category,
        article.display_headline(),
        article.read_time_minutes
    );
    if let Some(source) = &article.source {
        println!("     source: {source}");
    }
    if !article.link.is_empty() {
        println!("     {}", article.link);
    }
}
