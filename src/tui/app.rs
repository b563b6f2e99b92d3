use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode};
use futures_util::StreamExt;
use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Cell, Chart, Clear, Dataset, Paragraph, Row, Table},
    Frame,
};
use rust_decimal::Decimal;
use std::{collections::HashMap, time::Duration};
use tokio::sync::mpsc::{Receiver, Sender};
use tracing::warn;

use crate::{
    coin::Coin,
    favorites::Favorites,
    history::ChartSeries,
    store::MarketData,
    views::{self, Pager},
    AppEvent, FetchCommand,
};

const DEFAULT_COIN: &str = "bitcoin";
/// Rows per page of the all-coins table.
const TABLE_ROWS: usize = 10;
/// How many coins the selector cycles through.
const SELECTOR_COINS: usize = 10;

/// Overlay state. Esc (or a click-away in the original) closes either
/// overlay; there are no intermediate states.
enum Modal {
    Closed,
    Details(Coin),
    Favorites,
}

/// Where keystrokes go: dashboard navigation or the search box.
#[derive(PartialEq, Eq)]
enum InputMode {
    Normal,
    Search,
}

pub struct App {
    should_quit: bool,
    rx: Receiver<AppEvent>,
    tx_cmd: Sender<FetchCommand>,
    fetch_page: u32,
    fetch_per_page: u32,

    market: MarketData,
    charts: HashMap<String, ChartSeries>,
    favorites: Favorites,

    selected_coin_id: String,
    search: String,
    input_mode: InputMode,
    pager: Pager,
    cursor: usize,
    favorites_cursor: usize,
    modal: Modal,
}

impl App {
    pub fn new(
        rx: Receiver<AppEvent>,
        tx_cmd: Sender<FetchCommand>,
        fetch_page: u32,
        fetch_per_page: u32,
        favorites: Favorites,
    ) -> Self {
        Self {
            should_quit: false,
            rx,
            tx_cmd,
            fetch_page,
            fetch_per_page,
            market: MarketData::default(),
            charts: HashMap::new(),
            favorites,
            selected_coin_id: DEFAULT_COIN.to_string(),
            search: String::new(),
            input_mode: InputMode::Normal,
            pager: Pager::new(TABLE_ROWS),
            cursor: 0,
            favorites_cursor: 0,
            modal: Modal::Closed,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        let mut terminal = ratatui::init();
        let _ = terminal.clear();

        self.request_markets();

        let mut events = EventStream::new();

        let period = Duration::from_secs_f64(1.0 / 20.0);
        let mut interval = tokio::time::interval(period);

        while !self.should_quit {
            tokio::select! {
                _ = interval.tick() => { terminal.draw(|frame| self.render(frame))?; },
                Some(Ok(event)) = events.next() => self.handle_events(event),
                Some(event) = self.rx.recv() => self.handle_app_events(event),
            }
        }

        Ok(())
    }

    fn send(&self, cmd: FetchCommand) {
        if self.tx_cmd.try_send(cmd).is_err() {
            warn!("fetch channel full, dropping request");
        }
    }

    fn request_markets(&mut self) {
        self.market.begin_fetch();
        self.send(FetchCommand::Markets {
            page: self.fetch_page,
            per_page: self.fetch_per_page,
        });
    }

    fn request_chart_if_missing(&mut self) {
        if !self.charts.contains_key(&self.selected_coin_id) {
            self.send(FetchCommand::Chart {
                coin_id: self.selected_coin_id.clone(),
            });
        }
    }

    fn handle_app_events(&mut self, event: AppEvent) {
        match event {
            AppEvent::Markets(result) => {
                self.market.apply(result);
                let filtered_len = self.filtered().len();
                self.pager.clamp(filtered_len);
                self.clamp_cursor();
                // the default selection may not exist on this market page
                if self.market.find(&self.selected_coin_id).is_none() {
                    if let Some(first) = self.market.coins().first() {
                        self.selected_coin_id = first.id.clone();
                    }
                }
                if !self.market.coins().is_empty() {
                    self.request_chart_if_missing();
                }
            }
            AppEvent::Chart { coin_id, result } => match result {
                Ok(chart) => {
                    self.charts.insert(coin_id, chart.series());
                }
                Err(message) => {
                    warn!("chart fetch for {coin_id} failed: {message}");
                    // render falls back to the "no data" placeholder
                    self.charts.insert(coin_id, ChartSeries::default());
                }
            },
        }
    }

    fn handle_events(&mut self, event: Event) {
        let Some(key) = event.as_key_press_event() else {
            return;
        };

        match self.modal {
            Modal::Details(_) => {
                match key.code {
                    KeyCode::Char('f') => self.toggle_favorite(),
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Enter => {
                        self.modal = Modal::Closed;
                    }
                    _ => {}
                }
                return;
            }
            Modal::Favorites => {
                match key.code {
                    KeyCode::Up => {
                        self.favorites_cursor = self.favorites_cursor.saturating_sub(1);
                    }
                    KeyCode::Down => {
                        let last = self.favorites.coins().len().saturating_sub(1);
                        self.favorites_cursor = (self.favorites_cursor + 1).min(last);
                    }
                    KeyCode::Char('d') | KeyCode::Delete => self.remove_highlighted_favorite(),
                    KeyCode::Esc | KeyCode::Char('q') => self.modal = Modal::Closed,
                    _ => {}
                }
                return;
            }
            Modal::Closed => {}
        }

        if self.input_mode == InputMode::Search {
            match key.code {
                KeyCode::Esc | KeyCode::Enter => self.input_mode = InputMode::Normal,
                KeyCode::Backspace => {
                    self.search.pop();
                    self.on_search_changed();
                }
                KeyCode::Char(c) => {
                    self.search.push(c);
                    self.on_search_changed();
                }
                _ => {}
            }
            return;
        }

        let filtered_len = self.filtered().len();
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('/') => self.input_mode = InputMode::Search,
            KeyCode::Char('r') => self.request_markets(),
            KeyCode::Char('s') | KeyCode::Tab => self.cycle_selected_coin(),
            KeyCode::Char('f') => {
                self.favorites_cursor = 0;
                self.modal = Modal::Favorites;
            }
            KeyCode::Up => {
                self.cursor = self.cursor.saturating_sub(1);
            }
            KeyCode::Down => {
                self.cursor += 1;
                self.clamp_cursor();
            }
            KeyCode::Left => {
                self.pager.prev();
                self.clamp_cursor();
            }
            KeyCode::Right => {
                self.pager.next(filtered_len);
                self.clamp_cursor();
            }
            KeyCode::Home => {
                self.pager.first();
                self.clamp_cursor();
            }
            KeyCode::End => {
                self.pager.last(filtered_len);
                self.clamp_cursor();
            }
            KeyCode::Enter => self.open_details(),
            _ => {}
        }
    }

    fn on_search_changed(&mut self) {
        self.pager.reset();
        self.cursor = 0;
    }

    /// The coins matching the current search text, in fetch order.
    fn filtered(&self) -> Vec<&Coin> {
        views::filter_coins(self.market.coins(), &self.search)
    }

    fn clamp_cursor(&mut self) {
        let page_len = self.pager.slice(&self.filtered()).len();
        self.cursor = self.cursor.min(page_len.saturating_sub(1));
    }

    fn highlighted_coin(&self) -> Option<Coin> {
        let filtered = self.filtered();
        self.pager.slice(&filtered).get(self.cursor).map(|coin| (*coin).clone())
    }

    fn open_details(&mut self) {
        if let Some(coin) = self.highlighted_coin() {
            self.modal = Modal::Details(coin);
        }
    }

    fn toggle_favorite(&mut self) {
        let coin = match &self.modal {
            Modal::Details(coin) => coin.clone(),
            _ => return,
        };
        if let Err(err) = self.favorites.toggle(&coin) {
            warn!("could not persist favorites: {err:#}");
        }
    }

    fn remove_highlighted_favorite(&mut self) {
        let Some(coin_id) = self
            .favorites
            .coins()
            .get(self.favorites_cursor)
            .map(|coin| coin.id.clone())
        else {
            return;
        };
        if let Err(err) = self.favorites.remove(&coin_id) {
            warn!("could not persist favorites: {err:#}");
        }
        let last = self.favorites.coins().len().saturating_sub(1);
        self.favorites_cursor = self.favorites_cursor.min(last);
    }

    /// Steps the tracked coin through the first coins of the listing,
    /// the terminal stand-in for the original's dropdown selector.
    fn cycle_selected_coin(&mut self) {
        let coins = self.market.coins();
        if coins.is_empty() {
            return;
        }
        let selector: Vec<&Coin> = coins.iter().take(SELECTOR_COINS).collect();
        let position = selector
            .iter()
            .position(|coin| coin.id == self.selected_coin_id);
        let next = match position {
            Some(i) => (i + 1) % selector.len(),
            None => 0,
        };
        self.selected_coin_id = selector[next].id.clone();
        self.request_chart_if_missing();
    }

    fn render(&self, frame: &mut Frame) {
        let [header_area, chart_area, tables_area, footer_area] = Layout::vertical([
            Constraint::Length(5),
            Constraint::Length(12),
            Constraint::Fill(1),
            Constraint::Length(3),
        ])
        .areas(frame.area());

        let [coins_area, gainers_area] =
            Layout::horizontal([Constraint::Fill(3), Constraint::Fill(2)]).areas(tables_area);

        self.render_header(frame, header_area);
        self.render_chart(frame, chart_area);
        self.render_coins_table(frame, coins_area);
        self.render_gainers(frame, gainers_area);
        self.render_footer(frame, footer_area);

        match &self.modal {
            Modal::Details(coin) => self.render_details_modal(frame, coin),
            Modal::Favorites => self.render_favorites_modal(frame),
            Modal::Closed => {}
        }
    }

    fn render_header(&self, frame: &mut Frame, area: Rect) {
        let areas: [Rect; 4] =
            Layout::horizontal([Constraint::Fill(1); 4]).areas(area);

        let Some(coin) = self.market.find(&self.selected_coin_id) else {
            let line = if self.market.is_loading() {
                Line::from("Loading market data...")
            } else {
                Line::from("No market data")
            };
            frame.render_widget(
                Paragraph::new(line)
                    .block(Block::default().title("Coinwatch").borders(Borders::ALL)),
                area,
            );
            return;
        };

        let change = coin.price_change_percentage_24h;
        let blocks = [
            ("Crypto", coin.symbol_upper(), coin.name.clone(), Color::Cyan),
            (
                "Current Price",
                format!("$ {}", format_price(coin.current_price)),
                gecko_currency_label(),
                Color::Yellow,
            ),
            (
                "24h Change",
                format!("{}%", change.round_dp(3)),
                "Last 24 hours".to_string(),
                change_color(change),
            ),
            (
                "Market Cap",
                format!("$ {}", coin.market_cap.round_dp(0)),
                gecko_currency_label(),
                Color::Yellow,
            ),
        ];

        for ((title, value, subtitle, color), block_area) in blocks.into_iter().zip(areas) {
            let text = vec![
                Line::from(Span::styled(value, Style::default().fg(color))),
                Line::from(Span::styled(subtitle, Style::default().fg(Color::DarkGray))),
            ];
            frame.render_widget(
                Paragraph::new(text)
                    .block(Block::default().title(title).borders(Borders::ALL)),
                block_area,
            );
        }
    }

    fn render_chart(&self, frame: &mut Frame, area: Rect) {
        let title = match self.market.find(&self.selected_coin_id) {
            Some(coin) => format!("7-Day Price Trend - {}", coin.name),
            None => "7-Day Price Trend".to_string(),
        };
        let block = Block::default().title(title).borders(Borders::ALL);

        let series = self.charts.get(&self.selected_coin_id);
        let Some(series) = series.filter(|series| !series.is_empty()) else {
            let message = match series {
                // fetched, but the window came back empty
                Some(_) => format!("No price data for {}", self.selected_coin_id),
                None => format!("Loading history for {}...", self.selected_coin_id),
            };
            frame.render_widget(Paragraph::new(Line::from(message)).block(block), area);
            return;
        };

        let data: Vec<(f64, f64)> = series
            .points
            .iter()
            .enumerate()
            .map(|(i, price)| (i as f64, *price))
            .collect();

        let min_price = data.iter().map(|d| d.1).reduce(f64::min).unwrap_or(0.);
        let max_price = data.iter().map(|d| d.1).reduce(f64::max).unwrap_or(0.);

        let gaining = self
            .market
            .find(&self.selected_coin_id)
            .map(|coin| coin.is_gaining())
            .unwrap_or(true);

        let dataset = Dataset::default()
            .data(&data)
            .marker(symbols::Marker::Braille)
            .style(Style::default().fg(if gaining { Color::Green } else { Color::Red }))
            .graph_type(ratatui::widgets::GraphType::Line);

        let x_labels: Vec<Span> = series
            .labels
            .iter()
            .map(|label| Span::raw(label.clone()))
            .collect();

        let chart = Chart::new(vec![dataset])
            .x_axis(
                Axis::default()
                    .bounds([0., (data.len() - 1) as f64])
                    .labels(x_labels),
            )
            .y_axis(
                Axis::default()
                    .title("USD")
                    .bounds([min_price, max_price])
                    .labels([
                        Span::raw(format!("{min_price:.2}")),
                        Span::raw(format!("{max_price:.2}")),
                    ]),
            )
            .block(block);

        frame.render_widget(chart, area);
    }

    fn render_coins_table(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().title("All Coins").borders(Borders::ALL);

        if let Some(message) = self.market.error() {
            let p = Paragraph::new(Line::from(Span::styled(
                message.to_string(),
                Style::default().fg(Color::Red),
            )))
            .block(block);
            frame.render_widget(p, area);
            return;
        }
        if self.market.is_loading() {
            frame.render_widget(
                Paragraph::new(Line::from("Loading market data...")).block(block),
                area,
            );
            return;
        }

        let [search_area, table_area, pages_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Fill(1),
            Constraint::Length(1),
        ])
        .areas(block.inner(area));
        frame.render_widget(block, area);

        let search_style = match self.input_mode {
            InputMode::Search => Style::default().fg(Color::Cyan),
            InputMode::Normal => Style::default().fg(Color::DarkGray),
        };
        let search_line = Line::from(vec![
            Span::styled("Search: ", search_style),
            Span::raw(self.search.clone()),
            Span::styled(
                if self.input_mode == InputMode::Search { "_" } else { "" },
                search_style,
            ),
        ]);
        frame.render_widget(Paragraph::new(search_line), search_area);

        let filtered = self.filtered();
        let rows: Vec<Row> = self
            .pager
            .slice(&filtered)
            .iter()
            .enumerate()
            .map(|(i, coin)| {
                let row = coin_row(coin, self.favorites.contains(&coin.id));
                if i == self.cursor {
                    row.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row
                }
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Fill(2),
                Constraint::Length(7),
                Constraint::Fill(1),
                Constraint::Length(10),
                Constraint::Fill(1),
            ],
        )
        .header(
            Row::new(["Rank", "Name", "Symbol", "Price", "Change 24h", "Market Cap"])
                .style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(table, table_area);

        let pages = Line::from(format!(
            "Page {} of {}",
            self.pager.page + 1,
            self.pager.page_count(filtered.len())
        ));
        frame.render_widget(Paragraph::new(pages).right_aligned(), pages_area);
    }

    fn render_gainers(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .title("Top 5 Gainers (24h)")
            .borders(Borders::ALL);

        let gainers = views::top_gainers(self.market.coins());
        if gainers.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from("No gainers to show")).block(block),
                area,
            );
            return;
        }

        let rows: Vec<Row> = gainers
            .iter()
            .map(|coin| coin_row(coin, self.favorites.contains(&coin.id)))
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Fill(2),
                Constraint::Length(7),
                Constraint::Fill(1),
                Constraint::Length(10),
                Constraint::Fill(1),
            ],
        )
        .header(
            Row::new(["Rank", "Name", "Symbol", "Price", "Change 24h", "Market Cap"])
                .style(Style::default().fg(Color::Green)),
        )
        .block(block);
        frame.render_widget(table, area);
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let hints = match (&self.modal, &self.input_mode) {
            (Modal::Details(_), _) => "f favorite | Esc close",
            (Modal::Favorites, _) => "d remove | Esc close",
            (_, InputMode::Search) => "type to filter | Esc done",
            _ => "q quit | / search | Enter details | f favorites | s coin | r refresh | arrows navigate",
        };
        frame.render_widget(
            Paragraph::new(Line::from(hints)).block(Block::default().borders(Borders::ALL)),
            area,
        );
    }

    fn render_details_modal(&self, frame: &mut Frame, coin: &Coin) {
        let area = popup_area(frame.area(), 60, 16);
        frame.render_widget(Clear, area);

        let favorite = self.favorites.contains(&coin.id);
        let title = format!(
            "{} ({}){}",
            coin.name,
            coin.symbol_upper(),
            if favorite { " ♥" } else { "" }
        );
        let block = Block::default().title(title).borders(Borders::ALL);

        let date = |d: &Option<chrono::DateTime<chrono::Utc>>| {
            d.map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "N/A".to_string())
        };
        let lines = vec![
            detail_line("Current Price", format!("$ {}", format_price(coin.current_price))),
            detail_line("24h High", format!("$ {}", format_price(coin.high_24h))),
            detail_line("24h Low", format!("$ {}", format_price(coin.low_24h))),
            detail_line("Market Cap", format!("$ {}", coin.market_cap.round_dp(0))),
            detail_line("Total Volume", format!("$ {}", coin.total_volume.round_dp(0))),
            detail_line(
                "ATH",
                format!("$ {} ({})", format_price(coin.ath), date(&coin.ath_date)),
            ),
            detail_line(
                "ATL",
                format!("$ {} ({})", format_price(coin.atl), date(&coin.atl_date)),
            ),
            detail_line(
                "Circulating Supply",
                coin.circulating_supply.round_dp(0).to_string(),
            ),
            detail_line(
                "Total Supply",
                coin.total_supply
                    .map(|supply| supply.round_dp(0).to_string())
                    .unwrap_or_else(|| "N/A".to_string()),
            ),
            Line::from(vec![
                Span::styled("Price Change 24h: ", Style::default().fg(Color::DarkGray)),
                Span::styled(
                    format!(
                        "$ {} ({}%)",
                        coin.price_change_24h.round_dp(2),
                        coin.price_change_percentage_24h.round_dp(2)
                    ),
                    Style::default().fg(change_color(coin.price_change_percentage_24h)),
                ),
            ]),
        ];

        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn render_favorites_modal(&self, frame: &mut Frame) {
        let area = popup_area(frame.area(), 60, 16);
        frame.render_widget(Clear, area);

        let block = Block::default().title("Favorite Coins").borders(Borders::ALL);

        if self.favorites.is_empty() {
            frame.render_widget(
                Paragraph::new(Line::from("You have no favorite coins saved yet."))
                    .block(block),
                area,
            );
            return;
        }

        // favorites render their saved snapshot, which may lag the market
        let rows: Vec<Row> = self
            .favorites
            .coins()
            .iter()
            .enumerate()
            .map(|(i, coin)| {
                let row = coin_row(coin, true);
                if i == self.favorites_cursor {
                    row.style(Style::default().add_modifier(Modifier::REVERSED))
                } else {
                    row
                }
            })
            .collect();
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Fill(2),
                Constraint::Length(7),
                Constraint::Fill(1),
                Constraint::Length(10),
                Constraint::Fill(1),
            ],
        )
        .block(block);
        frame.render_widget(table, area);
    }
}

fn coin_row(coin: &Coin, favorite: bool) -> Row<'static> {
    let change = coin.price_change_percentage_24h;
    Row::new(vec![
        Cell::from(
            coin.market_cap_rank
                .map(|rank| rank.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
        Cell::from(format!(
            "{}{}",
            coin.name.clone(),
            if favorite { " ♥" } else { "" }
        )),
        Cell::from(Span::styled(
            coin.symbol_upper(),
            Style::default().fg(Color::Cyan),
        )),
        Cell::from(format!("$ {}", format_price(coin.current_price))),
        Cell::from(Span::styled(
            format!("{}%", change.round_dp(2)),
            Style::default().fg(change_color(change)),
        )),
        Cell::from(format!("$ {}", coin.market_cap.round_dp(0))),
    ])
}

fn detail_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(Color::DarkGray)),
        Span::raw(value),
    ])
}

fn change_color(change: Decimal) -> Color {
    if change >= Decimal::ZERO {
        Color::Green
    } else {
        Color::Red
    }
}

/// Sub-dollar coins need more precision to show anything at all.
fn format_price(price: Decimal) -> String {
    if price.abs() < Decimal::ONE {
        price.round_dp(6).to_string()
    } else {
        price.round_dp(2).to_string()
    }
}

fn gecko_currency_label() -> String {
    crate::gecko::VS_CURRENCY.to_uppercase()
}

fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let [area] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    area
}
