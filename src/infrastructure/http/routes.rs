//! The fixed route table.
//!
//! Every route is a parameterless `GET`. Query routes carry their SQL text
//! verbatim; nothing from the request is ever interpolated into it.

/// What a route answers with once admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    /// Plain-text body, no database access
    Text(&'static str),
    /// Rows of a fixed query as a JSON array
    Query(&'static str),
}

/// One entry of the route table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    /// URL path
    pub path: &'static str,
    /// Response source
    pub kind: RouteKind,
}

/// Body of the root route.
pub const GREETING: &str = "Welcome to the query gateway";

const EVENTS_HOURLY: &str = "
    SELECT date, hour, events, name, lat, lon
    FROM public.hourly_events AS e
    LEFT OUTER JOIN public.poi AS p ON e.poi_id = p.poi_id
    ORDER BY date, hour
    LIMIT 168";

const EVENTS_DAILY: &str = "
    SELECT date, SUM(events) AS events, name, lat, lon, p.poi_id
    FROM public.hourly_events AS e
    LEFT OUTER JOIN public.poi AS p ON e.poi_id = p.poi_id
    GROUP BY date, name, lat, lon, p.poi_id
    ORDER BY date
    LIMIT 7";

const STATS_HOURLY: &str = "
    SELECT *
    FROM public.hourly_stats AS s
    LEFT OUTER JOIN public.poi AS p ON s.poi_id = p.poi_id
    ORDER BY date, hour
    LIMIT 168";

const STATS_DAILY: &str = "
    SELECT date,
        SUM(impressions) AS impressions,
        SUM(clicks) AS clicks,
        SUM(revenue) AS revenue,
        name,
        lat,
        lon
    FROM public.hourly_stats AS s
    LEFT OUTER JOIN public.poi AS p ON s.poi_id = p.poi_id
    GROUP BY date, name, lat, lon
    ORDER BY date
    LIMIT 7";

const POI: &str = "
    SELECT *
    FROM public.poi";

/// All routes served, in registration order.
pub const ROUTES: &[Route] = &[
    Route {
        path: "/",
        kind: RouteKind::Text(GREETING),
    },
    Route {
        path: "/events/hourly",
        kind: RouteKind::Query(EVENTS_HOURLY),
    },
    Route {
        path: "/events/daily",
        kind: RouteKind::Query(EVENTS_DAILY),
    },
    Route {
        path: "/stats/hourly",
        kind: RouteKind::Query(STATS_HOURLY),
    },
    Route {
        path: "/stats/daily",
        kind: RouteKind::Query(STATS_DAILY),
    },
    Route {
        path: "/poi",
        kind: RouteKind::Query(POI),
    },
];
